//! A `/proc/self/maps`-backed [`LibraryOracle`]. Answers whether an address
//! falls inside a mapped, executable region -- good enough to gate a
//! speculative instruction read, not a symbolizer.

use std::fs;
use std::sync::RwLock;

use crate::wallclock::traits::{LibraryOracle, MappedLibrary};

struct Mapping {
    start: usize,
    end: usize,
}

pub struct ProcMapsOracle {
    mappings: RwLock<Vec<Mapping>>,
}

impl ProcMapsOracle {
    pub fn new() -> Self {
        let oracle = Self { mappings: RwLock::new(Vec::new()) };
        oracle.refresh();
        oracle
    }

    /// Re-reads `/proc/self/maps`. Cheap enough to call occasionally; the
    /// classifier only needs an oracle that is eventually consistent with
    /// the process's actual mappings.
    pub fn refresh(&self) {
        let contents = match fs::read_to_string("/proc/self/maps") {
            Ok(c) => c,
            Err(_) => return,
        };

        let mut mappings = Vec::new();

        for line in contents.lines() {
            let mut fields = line.split_whitespace();
            let Some(range) = fields.next() else { continue };
            let Some(perms) = fields.next() else { continue };

            if !perms.contains('x') {
                continue;
            }

            let Some((start, end)) = range.split_once('-') else { continue };
            let (Ok(start), Ok(end)) = (
                usize::from_str_radix(start, 16),
                usize::from_str_radix(end, 16),
            ) else {
                continue;
            };

            mappings.push(Mapping { start, end });
        }

        *self.mappings.write().unwrap() = mappings;
    }
}

impl Default for ProcMapsOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryOracle for ProcMapsOracle {
    fn find_library(&self, addr: usize) -> Option<MappedLibrary> {
        let mappings = self.mappings.read().unwrap();
        mappings
            .iter()
            .find(|m| addr >= m.start && addr < m.end)
            .map(|m| MappedLibrary { base: m.start, end: m.end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_an_address_inside_its_own_mapped_code() {
        let oracle = ProcMapsOracle::new();
        let addr = ProcMapsOracle::new as usize;
        assert!(oracle.find_library(addr).is_some());
    }

    #[test]
    fn does_not_find_a_clearly_unmapped_address() {
        let oracle = ProcMapsOracle::new();
        assert!(oracle.find_library(usize::MAX - 8).is_none());
    }
}
