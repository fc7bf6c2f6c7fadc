//! Position maps: how edits move document positions.

/// Result of mapping a position through a step map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// Whether the token on the queried side of the position (chosen by
    /// the `assoc` argument) was replaced by the step.
    pub deleted: bool,
}

/// The position map of a single step, as ordered
/// `(start, old_size, new_size)` replacement ranges in the pre-step
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepMap {
    ranges: Vec<(usize, usize, usize)>,
}

impl StepMap {
    pub fn new(ranges: Vec<(usize, usize, usize)>) -> StepMap {
        StepMap { ranges }
    }

    pub fn identity() -> StepMap {
        StepMap::default()
    }

    /// Map a position forward through this step. `assoc` decides which
    /// side the position sticks to when content is inserted exactly at it:
    /// negative keeps it before the insertion, positive moves it after.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let mapped = start as isize
                    + diff
                    + if side < 0 { 0 } else { new_size as isize };
                let deleted = old_size > 0
                    && if assoc < 0 { pos != start } else { pos != end };
                return MapResult {
                    pos: mapped as usize,
                    deleted,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            deleted: false,
        }
    }

    /// Visit each replaced range as
    /// `(old_start, old_end, new_start, new_end)`.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            let new_start = (start as isize + diff) as usize;
            f(start, start + old_size, new_start, new_start + new_size);
            diff += new_size as isize - old_size as isize;
        }
    }
}

/// A cumulative mapping: the step maps of a sequence of steps, applied in
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Mapping {
        Mapping::default()
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    /// The tail of this mapping: only the maps added at or after step
    /// index `from`. Used to re-map values that were derived from an
    /// intermediate document.
    pub fn slice_from(&self, from: usize) -> Mapping {
        let from = from.min(self.maps.len());
        Mapping {
            maps: self.maps[from..].to_vec(),
        }
    }

    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let mut result = MapResult {
            pos,
            deleted: false,
        };
        for map in &self.maps {
            let step = map.map_result(result.pos, assoc);
            result = MapResult {
                pos: step.pos,
                deleted: result.deleted || step.deleted,
            };
        }
        result
    }
}
