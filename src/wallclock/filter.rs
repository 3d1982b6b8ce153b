//! Concrete [`ThreadFilter`] implementations beyond [`super::traits::NoFilter`].

use std::collections::HashSet;

use super::traits::ThreadFilter;

/// Restricts sampling to an explicit set of tids, read from configuration.
pub struct AllowList {
    tids: HashSet<i32>,
}

impl AllowList {
    pub fn new(tids: impl IntoIterator<Item = i32>) -> Self {
        Self { tids: tids.into_iter().collect() }
    }
}

impl ThreadFilter for AllowList {
    fn enabled(&self) -> bool {
        true
    }

    fn size(&self) -> usize {
        self.tids.len()
    }

    fn accept(&self, tid: i32) -> bool {
        self.tids.contains(&tid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_accepts_only_listed_tids() {
        let filter = AllowList::new([2, 4, 6]);
        assert!(filter.enabled());
        assert_eq!(filter.size(), 3);
        assert!(filter.accept(4));
        assert!(!filter.accept(5));
    }
}
