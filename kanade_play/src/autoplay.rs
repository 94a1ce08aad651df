use kanade_chart::Note;

use crate::{
    judge::{pending_note, Judge, Tier},
    state::PlayState,
};

impl Judge {
    /// Resolves the pending note of `lane` with the best tier once its time is reached,
    /// regardless of kind.
    pub fn autoplay(
        &self,
        lanes: &[Vec<Note>],
        state: &mut PlayState,
        lane: usize,
        now: f64,
    ) -> Option<Tier> {
        let note = pending_note(lanes, state, lane)?;
        if note.time > now {
            return None;
        }

        state.record(lane, self.judgment(Tier::Marvelous, Some(0.0)));
        state.pulse_judgment();

        Some(Tier::Marvelous)
    }
}

#[cfg(test)]
mod tests {
    use kanade_chart::NoteKind;

    use crate::judge::HitWindows;

    use super::*;

    #[test]
    fn test_autoplay_resolves_on_time() {
        let lanes = vec![vec![
            Note::new(1000.0, NoteKind::LongHead),
            Note::new(1500.0, NoteKind::LongTail),
        ]];
        let judge = Judge::new(HitWindows::default(), 0.0);
        let mut state = PlayState::new(1);

        assert_eq!(judge.autoplay(&lanes, &mut state, 0, 999.0), None);
        assert_eq!(
            judge.autoplay(&lanes, &mut state, 0, 1000.0),
            Some(Tier::Marvelous)
        );
        // One note per call.
        assert_eq!(judge.autoplay(&lanes, &mut state, 0, 1200.0), None);
        assert_eq!(
            judge.autoplay(&lanes, &mut state, 0, 1600.0),
            Some(Tier::Marvelous)
        );
        assert_eq!(judge.autoplay(&lanes, &mut state, 0, 9000.0), None);

        assert_eq!(state.combo().current(), 2);
        assert_eq!(state.ledger().accuracy(), Some(1.0));
        assert!(state.take_feedback().judgment_pulse);
    }
}
