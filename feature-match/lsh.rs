//! Multi-table locality-sensitive hashing over packed binary descriptors.
//!
//! Each table hashes a descriptor by sampling a fixed, seeded subset of its
//! bits. Queries visit the exact bucket in every table first, then the
//! buckets within `multi_probe_level` bit flips of it.

use std::collections::HashMap;

use rand::{rngs::StdRng, seq::index, SeedableRng};

use crate::config::LshParams;

const TABLE_SEED: u64 = 0x15A_0001;

#[derive(Debug, Clone)]
struct HashTable {
    /// Bit positions sampled from the descriptor, in key order
    bits: Vec<usize>,
    buckets: HashMap<u32, Vec<usize>>,
}

impl HashTable {
    fn key(&self, row: &[u8]) -> u32 {
        self.bits.iter().enumerate().fold(0u32, |key, (i, &bit)| {
            let set = (row[bit / 8] >> (bit % 8)) & 1;
            key | (u32::from(set) << i)
        })
    }
}

/// Hamming distance between two packed rows
#[inline]
pub fn hamming(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// XOR masks for every key within `level` bit flips, nearest first
pub fn probe_masks(key_bits: usize, level: usize) -> Vec<u32> {
    let mut masks = vec![0u32];
    if level >= 1 {
        masks.extend((0..key_bits).map(|i| 1u32 << i));
    }
    if level >= 2 {
        for i in 0..key_bits {
            for j in (i + 1)..key_bits {
                masks.push((1u32 << i) | (1u32 << j));
            }
        }
    }
    masks
}

/// Index over the rows of one binary descriptor matrix
#[derive(Debug, Clone)]
pub struct LshIndex<'a> {
    rows: Vec<&'a [u8]>,
    tables: Vec<HashTable>,
    probes: Vec<u32>,
}

impl<'a> LshIndex<'a> {
    pub fn build(rows: Vec<&'a [u8]>, bytes: usize, params: &LshParams) -> Self {
        let total_bits = bytes * 8;
        let key_bits = params.key_size.min(total_bits);
        let mut tables = Vec::with_capacity(params.table_number);

        for t in 0..params.table_number {
            let mut rng = StdRng::seed_from_u64(TABLE_SEED + t as u64);
            let bits = index::sample(&mut rng, total_bits, key_bits).into_vec();
            let mut table = HashTable {
                bits,
                buckets: HashMap::new(),
            };
            for (i, row) in rows.iter().enumerate() {
                let key = table.key(row);
                table.buckets.entry(key).or_default().push(i);
            }
            tables.push(table);
        }

        Self {
            rows,
            tables,
            probes: probe_masks(key_bits, params.multi_probe_level),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct train indices sharing a probed bucket with `query`, at most
    /// `checks` of them
    pub fn candidates(&self, query: &[u8], checks: usize) -> Vec<usize> {
        let mut seen = vec![false; self.rows.len()];
        let mut out = Vec::new();
        let keys: Vec<u32> = self.tables.iter().map(|t| t.key(query)).collect();

        for &mask in &self.probes {
            for (table, &key) in self.tables.iter().zip(&keys) {
                let Some(bucket) = table.buckets.get(&(key ^ mask)) else {
                    continue;
                };
                for &i in bucket {
                    if !seen[i] {
                        seen[i] = true;
                        out.push(i);
                        if out.len() >= checks {
                            return out;
                        }
                    }
                }
            }
        }
        out
    }

    /// The `k` nearest candidates as (train index, distance), closest first
    pub fn knn(&self, query: &[u8], k: usize, checks: usize) -> Vec<(usize, u32)> {
        let mut scored: Vec<(usize, u32)> = self
            .candidates(query, checks.max(k))
            .into_iter()
            .map(|i| (i, hamming(query, self.rows[i])))
            .collect();
        scored.sort_by_key(|&(i, d)| (d, i));
        scored.truncate(k);
        scored
    }
}
