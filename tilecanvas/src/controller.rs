//! Turns user input into changes of the [`Viewport`].

use std::time::{Duration, Instant};

use egui::Vec2;

use crate::options::MapOptions;
use crate::viewport::{SurfaceSize, Viewport};
use crate::zoom::Zoom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Idle,
    Dragging,
    ResizePending,
}

/// What needs to happen to the scene after an input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Nothing,

    /// Move what is already drawn, no redraw needed.
    Shift(Vec2),

    Redraw,
}

#[derive(Debug, Clone)]
pub struct Controller {
    state: State,

    /// Latest size reported, and when.
    pending_resize: Option<(SurfaceSize, Instant)>,

    debounce: Duration,
    min_zoom: Zoom,
    max_zoom: Zoom,
}

impl Controller {
    pub fn new(options: &MapOptions) -> Self {
        Self {
            state: State::Idle,
            pending_resize: None,
            debounce: options.resize_debounce,
            min_zoom: options.min_zoom.min(options.max_zoom),
            max_zoom: options.max_zoom,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn drag_start(&mut self) -> Effect {
        self.state = State::Dragging;
        Effect::Nothing
    }

    pub fn drag_move(&mut self, viewport: &mut Viewport, delta: Vec2) -> Effect {
        self.state = State::Dragging;
        if delta == Vec2::ZERO {
            return Effect::Nothing;
        }

        viewport.pan += delta;
        Effect::Shift(delta)
    }

    pub fn drag_end(&mut self, viewport: &mut Viewport) -> Effect {
        self.state = self.settled_state();

        if viewport.commit_pan() {
            log::debug!("Center moved to {:?}.", viewport.center);
            Effect::Redraw
        } else {
            Effect::Nothing
        }
    }

    /// Zoom in (positive) or out (negative) by a number of levels. The center stays where it is.
    pub fn zoom(&mut self, viewport: &mut Viewport, steps: i32) -> Effect {
        if steps == 0 {
            return Effect::Nothing;
        }

        let mut zoom = viewport.zoom;
        if !zoom.step_clamped(steps, self.min_zoom, self.max_zoom) {
            log::trace!("Zoom {} is already at its limit.", viewport.zoom);
            return Effect::Nothing;
        }

        // Pan of an ongoing drag is in pixels of the previous zoom.
        viewport.commit_pan();
        viewport.zoom = zoom;
        Effect::Redraw
    }

    /// Surface size reported by the host. It is applied once no other size is reported for a
    /// while, see [`Self::poll`].
    pub fn resize(&mut self, viewport: &Viewport, size: SurfaceSize, now: Instant) -> Effect {
        let latest = self
            .pending_resize
            .map_or(viewport.size, |(pending, _)| pending);

        if latest == size {
            return Effect::Nothing;
        }

        self.pending_resize = Some((size, now));
        if self.state == State::Idle {
            self.state = State::ResizePending;
        }
        Effect::Nothing
    }

    /// Apply the pending resize, if it is old enough.
    pub fn poll(&mut self, viewport: &mut Viewport, now: Instant) -> Effect {
        match self.pending_resize {
            Some((size, since)) if now.saturating_duration_since(since) >= self.debounce => {
                self.pending_resize = None;
                if self.state == State::ResizePending {
                    self.state = State::Idle;
                }

                viewport.size = size;
                log::debug!("Surface resized to {}x{}.", size.width, size.height);
                Effect::Redraw
            }
            _ => Effect::Nothing,
        }
    }

    /// When the resize is going to be applied, if there is one waiting.
    pub fn resize_deadline(&self) -> Option<Instant> {
        self.pending_resize.map(|(_, since)| since + self.debounce)
    }

    fn settled_state(&self) -> State {
        if self.pending_resize.is_some() {
            State::ResizePending
        } else {
            State::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mercator::{to_position, to_tile};
    use crate::position::lat_lon;
    use approx::assert_relative_eq;
    use egui::vec2;

    fn viewport() -> Viewport {
        Viewport::new(
            lat_lon(38.9, -77.0),
            Zoom::try_from(15u8).unwrap(),
            SurfaceSize::new(500, 500),
            256,
        )
    }

    #[test]
    fn dragging_accumulates_pan_until_released() {
        let mut controller = Controller::new(&MapOptions::default());
        let mut viewport = viewport();

        assert_eq!(controller.drag_start(), Effect::Nothing);
        assert_eq!(controller.state(), State::Dragging);
        assert_eq!(
            controller.drag_move(&mut viewport, vec2(60., 0.)),
            Effect::Shift(vec2(60., 0.))
        );
        assert_eq!(
            controller.drag_move(&mut viewport, vec2(40., 0.)),
            Effect::Shift(vec2(40., 0.))
        );
        assert_eq!(viewport.pan, vec2(100., 0.));
        assert_eq!(viewport.center, lat_lon(38.9, -77.0));

        assert_eq!(controller.drag_end(&mut viewport), Effect::Redraw);
        assert_eq!(controller.state(), State::Idle);
        assert_eq!(viewport.pan, Vec2::ZERO);
        assert!(viewport.center.x() < -77.0);
        approx::assert_relative_eq!(viewport.center.y(), 38.9, epsilon = 1e-9);
    }

    #[test]
    fn click_without_movement_does_not_redraw() {
        let mut controller = Controller::new(&MapOptions::default());
        let mut viewport = viewport();

        controller.drag_start();
        assert_eq!(controller.drag_end(&mut viewport), Effect::Nothing);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut controller = Controller::new(&MapOptions::default());
        let mut viewport = viewport();

        assert_eq!(controller.zoom(&mut viewport, 3), Effect::Redraw);
        assert_eq!(viewport.zoom.level(), 18);
        assert_eq!(controller.zoom(&mut viewport, 5), Effect::Redraw);
        assert_eq!(viewport.zoom.level(), 19);
        assert_eq!(controller.zoom(&mut viewport, 1), Effect::Nothing);

        assert_eq!(controller.zoom(&mut viewport, -30), Effect::Redraw);
        assert_eq!(viewport.zoom.level(), 1);
        assert_eq!(controller.zoom(&mut viewport, -1), Effect::Nothing);

        // Center stays put.
        assert_eq!(viewport.center, lat_lon(38.9, -77.0));
    }

    #[test]
    fn zooming_while_dragging_keeps_the_dragged_distance() {
        let mut controller = Controller::new(&MapOptions::default());
        let mut viewport = viewport();

        controller.drag_start();
        controller.drag_move(&mut viewport, vec2(100., 0.));
        assert_eq!(controller.zoom(&mut viewport, 1), Effect::Redraw);

        // 100 pixels at zoom 15, where the drag happened.
        let expected = to_position(
            to_tile(lat_lon(38.9, -77.0), 15).offset(-100. / 256., 0.),
            15,
        );
        assert_eq!(viewport.zoom.level(), 16);
        assert_eq!(viewport.pan, Vec2::ZERO);
        assert_relative_eq!(viewport.center.x(), expected.x(), epsilon = 1e-9);
        assert_relative_eq!(viewport.center.y(), expected.y(), epsilon = 1e-9);
    }

    #[test]
    fn zoom_at_its_limit_leaves_the_drag_alone() {
        let mut controller = Controller::new(&MapOptions::default());
        let mut viewport = Viewport::new(
            lat_lon(38.9, -77.0),
            Zoom::try_from(19u8).unwrap(),
            SurfaceSize::new(500, 500),
            256,
        );

        controller.drag_start();
        controller.drag_move(&mut viewport, vec2(10., 0.));
        assert_eq!(controller.zoom(&mut viewport, 1), Effect::Nothing);
        assert_eq!(viewport.pan, vec2(10., 0.));
    }

    #[test]
    fn resizes_are_debounced() {
        let mut controller = Controller::new(&MapOptions::default());
        let mut viewport = viewport();
        let start = Instant::now();
        let at = |ms| start + Duration::from_millis(ms);

        controller.resize(&viewport, SurfaceSize::new(600, 400), at(0));
        assert_eq!(controller.state(), State::ResizePending);
        controller.resize(&viewport, SurfaceSize::new(700, 400), at(150));

        assert_eq!(controller.poll(&mut viewport, at(250)), Effect::Nothing);
        assert_eq!(viewport.size, SurfaceSize::new(500, 500));
        assert_eq!(controller.resize_deadline(), Some(at(350)));

        assert_eq!(controller.poll(&mut viewport, at(350)), Effect::Redraw);
        assert_eq!(viewport.size, SurfaceSize::new(700, 400));
        assert_eq!(controller.state(), State::Idle);

        assert_eq!(controller.poll(&mut viewport, at(1000)), Effect::Nothing);
    }

    #[test]
    fn identical_size_is_ignored() {
        let mut controller = Controller::new(&MapOptions::default());
        let mut viewport = viewport();
        let now = Instant::now();

        controller.resize(&viewport, SurfaceSize::new(500, 500), now);
        assert_eq!(controller.state(), State::Idle);
        assert_eq!(controller.resize_deadline(), None);

        controller.resize(&viewport, SurfaceSize::new(640, 480), now);
        controller.resize(
            &viewport,
            SurfaceSize::new(640, 480),
            now + Duration::from_millis(150),
        );

        // The repeated event did not postpone the resize.
        assert_eq!(
            controller.poll(&mut viewport, now + Duration::from_millis(200)),
            Effect::Redraw
        );
    }
}
