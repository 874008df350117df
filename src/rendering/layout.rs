//! Tile geometry for full-page captures
//!
//! A page of `total` pixels is covered by viewport-high tiles at offsets
//! `0, vh, 2*vh, ...`; the last tile is clamped to what remains.

/// Number of tiles needed to cover `total` pixels (`ceil(total / vh)`)
pub fn tile_count(total: u32, viewport_height: u32) -> u32 {
    if viewport_height == 0 {
        return 0;
    }
    total.div_ceil(viewport_height)
}

/// Offsets of every tile, top to bottom
pub fn tile_offsets(total: u32, viewport_height: u32) -> Vec<u32> {
    (0..tile_count(total, viewport_height))
        .map(|i| i * viewport_height)
        .collect()
}

/// Rows of the tile at `offset` that belong on the page
pub fn draw_height(total: u32, viewport_height: u32, offset: u32) -> u32 {
    viewport_height.min(total.saturating_sub(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_last_tile_is_clamped() {
        assert_eq!(tile_offsets(1000, 400), vec![0, 400, 800]);
        let heights: Vec<u32> = tile_offsets(1000, 400)
            .into_iter()
            .map(|o| draw_height(1000, 400, o))
            .collect();
        assert_eq!(heights, vec![400, 400, 200]);
    }

    #[test]
    fn exact_multiple_has_no_extra_tile() {
        assert_eq!(tile_offsets(400, 400), vec![0]);
        assert_eq!(draw_height(400, 400, 0), 400);
        assert_eq!(tile_count(1200, 400), 3);
    }

    #[test]
    fn count_and_last_height_hold_across_sizes() {
        for total in 1..=50u32 {
            for vh in 1..=20u32 {
                let n = tile_count(total, vh);
                assert_eq!(n, (total + vh - 1) / vh);
                let last = *tile_offsets(total, vh).last().unwrap();
                assert_eq!(draw_height(total, vh, last), total - (n - 1) * vh);
            }
        }
    }

    #[test]
    fn zero_viewport_yields_no_tiles() {
        assert_eq!(tile_count(100, 0), 0);
        assert!(tile_offsets(100, 0).is_empty());
    }
}
