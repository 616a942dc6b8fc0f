//! Horizontal swipe over the audio button cycles the saved tracks.

use crate::audio::Direction;

/// Minimum horizontal travel, in pixels, for a drag to count as a swipe.
pub const SWIPE_THRESHOLD_PX: f64 = 50.0;

/// Direction for a drag of `dx` pixels (end minus start).
///
/// Dragging left moves to the next track, dragging right to the previous.
pub fn swipe_direction(dx: f64) -> Option<Direction> {
    if dx < -SWIPE_THRESHOLD_PX {
        Some(Direction::Next)
    } else if dx > SWIPE_THRESHOLD_PX {
        Some(Direction::Previous)
    } else {
        None
    }
}

/// Tracks one drag gesture from touch-down to touch-up.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwipeGesture {
    start_x: Option<f64>,
}

impl SwipeGesture {
    pub fn begin(&mut self, x: f64) {
        self.start_x = Some(x);
    }

    /// Finish the drag; `None` if it was too short or never began.
    pub fn end(&mut self, x: f64) -> Option<Direction> {
        let start = self.start_x.take()?;
        swipe_direction(x - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_drags_are_ignored() {
        assert_eq!(swipe_direction(0.0), None);
        assert_eq!(swipe_direction(50.0), None);
        assert_eq!(swipe_direction(-50.0), None);
    }

    #[test]
    fn long_drags_pick_a_direction() {
        assert_eq!(swipe_direction(-51.0), Some(Direction::Next));
        assert_eq!(swipe_direction(120.0), Some(Direction::Previous));
    }

    #[test]
    fn gesture_needs_a_start() {
        let mut gesture = SwipeGesture::default();
        assert_eq!(gesture.end(10.0), None);
        gesture.begin(200.0);
        assert_eq!(gesture.end(100.0), Some(Direction::Next));
        assert_eq!(gesture.end(0.0), None);
    }
}
