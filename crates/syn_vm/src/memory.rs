//! Program memory as a shared base image plus a per-instance overlay.
//!
//! The loaded image is immutable and reference counted, so clones of a
//! machine share it. Writes land in an ordered overlay map which doubles as
//! the *changed* diff: it holds exactly the addresses whose current value
//! differs from the image.
//!
//! Code may live in the overlay: a write past the image extends the range
//! that can be fetched, with the gap reading as zero.

use crate::word::Word;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Memory {
    /// Words as loaded. Never mutated after load.
    image: Arc<[Word]>,
    /// Cells that currently differ from `image`.
    changed: BTreeMap<Word, Word>,
}

impl Memory {
    pub fn new(image: Vec<Word>) -> Self {
        Self {
            image: image.into(),
            changed: BTreeMap::new(),
        }
    }

    /// Number of words in the loaded image.
    pub fn len(&self) -> usize {
        self.image.len()
    }

    /// One past the highest addressable cell: the image or the last written
    /// cell beyond it, whichever is further. Fetches at or past it end the
    /// program.
    pub fn extent(&self) -> usize {
        let written = self
            .changed
            .keys()
            .next_back()
            .map_or(0, |addr| *addr as usize + 1);
        self.image.len().max(written)
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    /// The value at load time. Addresses past the image read as zero.
    pub fn original(&self, addr: Word) -> Word {
        self.image.get(addr as usize).copied().unwrap_or(0)
    }

    pub fn read(&self, addr: Word) -> Word {
        match self.changed.get(&addr) {
            Some(v) => *v,
            None => self.original(addr),
        }
    }

    pub fn write(&mut self, addr: Word, value: Word) {
        if value == self.original(addr) {
            self.changed.remove(&addr);
        } else {
            self.changed.insert(addr, value);
        }
    }

    /// The diff against the loaded image.
    pub fn changed(&self) -> &BTreeMap<Word, Word> {
        &self.changed
    }

    /// Replaces the diff wholesale. Entries equal to the image are dropped.
    pub(crate) fn replace_changed(&mut self, diff: BTreeMap<Word, Word>) {
        self.changed = diff;
        let image = &self.image;
        self.changed
            .retain(|addr, value| image.get(*addr as usize).copied().unwrap_or(0) != *value);
    }

    /// Whether both memories were built from the same load.
    pub fn shares_image(&self, other: &Memory) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }

    /// Current contents over the image range.
    pub fn to_vec(&self) -> Vec<Word> {
        let mut words = self.image.to_vec();
        for (addr, value) in &self.changed {
            if let Some(slot) = words.get_mut(*addr as usize) {
                *slot = *value;
            }
        }
        words
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_through_to_image() {
        let mem = Memory::new(vec![5, 6, 7]);
        assert_eq!(mem.read(1), 6);
        assert_eq!(mem.read(100), 0);
        assert!(mem.changed().is_empty());
    }

    #[test]
    fn write_shadows_image() {
        let mut mem = Memory::new(vec![5, 6, 7]);
        mem.write(1, 60);
        assert_eq!(mem.read(1), 60);
        assert_eq!(mem.original(1), 6);
        assert_eq!(mem.changed().get(&1), Some(&60));
    }

    #[test]
    fn writing_original_value_clears_diff() {
        let mut mem = Memory::new(vec![5, 6, 7]);
        mem.write(2, 70);
        mem.write(2, 7);
        assert!(mem.changed().is_empty());
        mem.write(0, 5);
        assert!(mem.changed().is_empty());
    }

    #[test]
    fn writes_past_image_are_kept() {
        let mut mem = Memory::new(vec![1]);
        mem.write(40, 3);
        assert_eq!(mem.read(40), 3);
        assert_eq!(mem.len(), 1);
        assert_eq!(mem.to_vec(), vec![1]);
        assert_eq!(mem.extent(), 41);
    }

    #[test]
    fn extent_shrinks_when_overlay_reverts() {
        let mut mem = Memory::new(vec![1, 2]);
        assert_eq!(mem.extent(), 2);
        mem.write(9, 4);
        assert_eq!(mem.extent(), 10);
        mem.write(9, 0);
        assert_eq!(mem.extent(), 2);
    }

    #[test]
    fn clone_shares_image_not_diff() {
        let mut a = Memory::new(vec![1, 2, 3]);
        let mut b = a.clone();
        assert!(a.shares_image(&b));
        b.write(0, 9);
        a.write(1, 8);
        assert_eq!(a.to_vec(), vec![1, 8, 3]);
        assert_eq!(b.to_vec(), vec![9, 2, 3]);
    }

    #[test]
    fn replace_changed_normalizes() {
        let mut mem = Memory::new(vec![1, 2, 3]);
        mem.write(0, 4);
        mem.replace_changed(BTreeMap::from([(1, 2), (2, 30)]));
        assert_eq!(mem.changed(), &BTreeMap::from([(2, 30)]));
        assert_eq!(mem.to_vec(), vec![1, 2, 30]);
    }
}
