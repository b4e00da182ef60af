/// Remembers the level of detail the current meshes were built for.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LodTracker {
    current: Option<u32>,
}

impl LodTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<u32> {
        self.current
    }

    /// True (and records `lod`) when `lod` differs from the last built level.
    pub fn should_rebuild(&mut self, lod: u32) -> bool {
        if self.current == Some(lod) {
            return false;
        }
        self.current = Some(lod);
        true
    }

    /// Forgets the current level so the next call rebuilds.
    pub fn invalidate(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::LodTracker;

    #[test]
    fn unchanged_level_skips_rebuild() {
        let mut lod = LodTracker::new();
        assert!(lod.should_rebuild(2));
        assert!(!lod.should_rebuild(2));
        assert!(lod.should_rebuild(3));
        assert_eq!(lod.current(), Some(3));
        lod.invalidate();
        assert!(lod.should_rebuild(3));
    }
}
