// Game phase state machine and interaction flags

use glam::Vec3;

use crate::engine::camera::portrait_pull;
use crate::engine::tween::BatchId;

/// The single active stage of play. Forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GamePhase {
    Screws,
    Knife,
    Opening,
    Cut,
    Lift,
    Feed,
    Eating,
    Reveal,
}

/// Exit conditions. Each one is legal in exactly one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    ScrewsCleared,
    ShellClicked,
    HingeOpened,
    FleshCut,
    FleshRaised,
    FleshFed,
    DogSquatted,
}

impl GamePhase {
    pub const ALL: [GamePhase; 8] = [
        GamePhase::Screws,
        GamePhase::Knife,
        GamePhase::Opening,
        GamePhase::Cut,
        GamePhase::Lift,
        GamePhase::Feed,
        GamePhase::Eating,
        GamePhase::Reveal,
    ];

    /// Total transition function. Illegal pairs leave the phase unchanged.
    pub fn next(self, event: PhaseEvent) -> GamePhase {
        use GamePhase::*;
        use PhaseEvent::*;
        match (self, event) {
            (Screws, ScrewsCleared) => Knife,
            (Knife, ShellClicked) => Opening,
            (Opening, HingeOpened) => Cut,
            (Cut, FleshCut) => Lift,
            (Lift, FleshRaised) => Feed,
            (Feed, FleshFed) => Eating,
            (Eating, DogSquatted) => Reveal,
            (phase, _) => phase,
        }
    }

    /// Phases in which the knife can be picked up from the sidebar.
    pub fn accepts_knife(self) -> bool {
        matches!(self, GamePhase::Knife | GamePhase::Cut)
    }

    /// Batch tag for timers owned by this phase; leaving the phase cancels them.
    pub fn batch(self) -> BatchId {
        BatchId(self as u32)
    }

    /// Camera eye and look targets for this phase, pulled back on portrait viewports.
    /// `None` while opening: that sequence drives the camera itself.
    pub fn framing(self, aspect: f32) -> Option<(Vec3, Vec3)> {
        let pull = portrait_pull(aspect);
        let (eye, look) = match self {
            GamePhase::Screws | GamePhase::Knife => (Vec3::new(0.0, 5.0, 9.0), Vec3::ZERO),
            GamePhase::Opening => return None,
            GamePhase::Cut | GamePhase::Lift => {
                (Vec3::new(0.0, 3.5, 7.0), Vec3::new(0.0, -0.2, 0.0))
            }
            GamePhase::Feed => (Vec3::new(1.5, 3.5, 8.0), Vec3::new(1.5, 0.5, 0.0)),
            GamePhase::Eating => (Vec3::new(2.0, 2.5, 6.0), Vec3::new(2.0, 0.2, 0.0)),
            GamePhase::Reveal => (Vec3::new(1.5, 3.0, 10.0), Vec3::new(1.5, 1.5, 0.0)),
        };
        Some((eye + Vec3::new(0.0, 0.0, pull), look))
    }

    pub fn label(self) -> &'static str {
        match self {
            GamePhase::Screws => "screws",
            GamePhase::Knife => "knife",
            GamePhase::Opening => "opening",
            GamePhase::Cut => "cut",
            GamePhase::Lift => "lift",
            GamePhase::Feed => "feed",
            GamePhase::Eating => "eating",
            GamePhase::Reveal => "reveal",
        }
    }
}

/// Interaction flags owned by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub knife_selected: bool,
    /// A blocking sequence is running; pointer hits are ignored.
    pub animating: bool,
    pub flesh_lifted: bool,
    pub flesh_cut: bool,
    /// Oyster yaw drag in the screws phase.
    pub is_dragging: bool,
    /// Pointer held down with the knife in the cut phase.
    pub is_cutting: bool,
    pub is_dragging_flesh: bool,
    pub is_pinching: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: [PhaseEvent; 7] = [
        PhaseEvent::ScrewsCleared,
        PhaseEvent::ShellClicked,
        PhaseEvent::HingeOpened,
        PhaseEvent::FleshCut,
        PhaseEvent::FleshRaised,
        PhaseEvent::FleshFed,
        PhaseEvent::DogSquatted,
    ];

    #[test]
    fn happy_path_walks_every_phase_in_order() {
        let mut phase = GamePhase::Screws;
        let mut visited = vec![phase];
        for event in EVENTS {
            phase = phase.next(event);
            visited.push(phase);
        }
        assert_eq!(visited, GamePhase::ALL.to_vec());
    }

    #[test]
    fn transitions_never_go_back_or_skip() {
        for phase in GamePhase::ALL {
            for event in EVENTS {
                let next = phase.next(event);
                let from = phase as usize;
                let to = next as usize;
                assert!(to == from || to == from + 1, "{phase:?} --{event:?}--> {next:?}");
            }
        }
    }

    #[test]
    fn each_event_is_legal_in_exactly_one_phase() {
        for event in EVENTS {
            let legal = GamePhase::ALL.iter().filter(|p| p.next(event) != **p).count();
            assert_eq!(legal, 1, "{event:?}");
        }
    }

    #[test]
    fn reveal_is_terminal() {
        for event in EVENTS {
            assert_eq!(GamePhase::Reveal.next(event), GamePhase::Reveal);
        }
    }

    #[test]
    fn portrait_framing_pulls_back() {
        let (wide, _) = GamePhase::Feed.framing(16.0 / 9.0).expect("feed is framed");
        let (tall, look) = GamePhase::Feed.framing(0.5).expect("feed is framed");
        assert_eq!(wide, Vec3::new(1.5, 3.5, 8.0));
        assert_eq!(tall, Vec3::new(1.5, 3.5, 10.0));
        assert_eq!(look, Vec3::new(1.5, 0.5, 0.0));
        assert!(GamePhase::Opening.framing(1.0).is_none());
    }

    #[test]
    fn knife_selection_phases() {
        let accepting: Vec<GamePhase> =
            GamePhase::ALL.into_iter().filter(|p| p.accepts_knife()).collect();
        assert_eq!(accepting, vec![GamePhase::Knife, GamePhase::Cut]);
    }
}
