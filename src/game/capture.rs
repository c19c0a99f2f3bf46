use super::constants::CAPTURE_DURATION_SECS;
use super::contact::capture_pairs;
use super::player::Player;
use std::collections::HashMap;

/// A confirmed capture of a runner by a chaser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEvent {
    pub player_id: String,
    pub by: String,
}

/// Advances capture gauges for one tick and detains runners whose gauge
/// reaches the capture duration.
///
/// The gauge is cumulative: contact this tick adds `dt`, losing contact
/// leaves it untouched. A runner touched by several chasers at once earns
/// exactly one `dt`; the first pairing chaser is credited on the event.
pub fn process_captures(
    players: &mut HashMap<String, Player>,
    jail_x: f64,
    jail_y: f64,
    dt: f64,
) -> Vec<CaptureEvent> {
    let pairs = capture_pairs(players);

    let mut contacted: HashMap<String, String> = HashMap::new();
    for pair in pairs {
        contacted.entry(pair.runner_id).or_insert(pair.chaser_id);
    }

    let mut events = Vec::new();
    for (runner_id, chaser_id) in contacted {
        let Some(runner) = players.get_mut(&runner_id) else { continue };
        runner.capture_progress += dt;
        if runner.capture_progress >= CAPTURE_DURATION_SECS {
            runner.detain(jail_x, jail_y);
            events.push(CaptureEvent {
                player_id: runner_id,
                by: chaser_id,
            });
        }
    }
    events
}
