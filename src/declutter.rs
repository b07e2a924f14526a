use std::collections::HashSet;

/// Per-frame record of which cells already carry a label.
///
/// A label may only be placed when no claimed cell lies within
/// `row_radius` rows and `col_radius` columns of its anchor. Claims are
/// never revoked, so the first body in draw order wins a contested spot.
pub(crate) struct LabelOccupancy {
    row_radius: i32,
    col_radius: i32,
    taken: HashSet<(i32, i32)>,
}

impl LabelOccupancy {
    pub(crate) fn new(row_radius: i32, col_radius: i32) -> Self {
        Self {
            row_radius: row_radius.max(0),
            col_radius: col_radius.max(0),
            taken: HashSet::new(),
        }
    }

    pub(crate) fn is_free(&self, row: i32, col: i32) -> bool {
        for dr in -self.row_radius..=self.row_radius {
            for dc in -self.col_radius..=self.col_radius {
                if self.taken.contains(&(row + dr, col + dc)) {
                    return false;
                }
            }
        }
        true
    }

    /// Marks `(row, col)` as labelled if its neighbourhood is clear.
    pub(crate) fn claim(&mut self, row: i32, col: i32) -> bool {
        if !self.is_free(row, col) {
            return false;
        }
        self.taken.insert((row, col));
        true
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.taken.len()
    }
}

/// Short label for a body: up to three characters when zoomed in past
/// `abbrev_fov`, otherwise just the initial.
pub(crate) fn label_for(name: &str, fov: f64, abbrev_fov: f64) -> String {
    let take = if fov < abbrev_fov { 3 } else { 1 };
    name.chars().take(take).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_inside_the_radius_lose() {
        let mut occ = LabelOccupancy::new(1, 2);
        assert!(occ.claim(10, 10));
        for (r, c) in [(10, 10), (11, 12), (9, 8), (10, 11), (11, 9)] {
            assert!(!occ.claim(r, c), "({r},{c}) should be blocked");
        }
        assert_eq!(occ.len(), 1);
    }

    #[test]
    fn distant_labels_both_fit() {
        let mut occ = LabelOccupancy::new(1, 2);
        assert!(occ.claim(10, 10));
        assert!(occ.claim(10, 13));
        assert!(occ.claim(12, 10));
        assert!(occ.claim(8, 7));
        assert_eq!(occ.len(), 4);
    }

    #[test]
    fn fresh_grid_forgets_previous_frame() {
        let mut frame1 = LabelOccupancy::new(1, 2);
        assert!(frame1.claim(3, 3));
        let mut frame2 = LabelOccupancy::new(1, 2);
        assert!(frame2.claim(3, 3));
    }

    #[test]
    fn abbreviation_follows_zoom() {
        assert_eq!(label_for("Jupiter", 10.0, 5.0), "J");
        assert_eq!(label_for("Jupiter", 5.0, 5.0), "J");
        assert_eq!(label_for("Jupiter", 4.9, 5.0), "Jup");
        assert_eq!(label_for("Sun", 1.0, 5.0), "Sun");
        assert_eq!(label_for("Io", 1.0, 5.0), "Io");
    }
}
