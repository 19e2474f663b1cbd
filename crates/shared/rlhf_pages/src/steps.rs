use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepInfo {
    pub title: &'static str,
    pub description: &'static str,
}

/// Forward-only position within a fixed list of steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCursor {
    index: usize,
    len: usize,
}

impl StepCursor {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.len
    }

    /// Move one step forward. Returns `false` (and stays put) on the last step.
    pub fn advance(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Loop drivers re-enter earlier steps at mini-batch and update
    /// boundaries; manual navigation never does.
    pub(crate) fn jump_to(&mut self, index: usize) {
        self.index = index.min(self.len.saturating_sub(1));
    }

    pub fn view(&self, steps: &'static [StepInfo]) -> StepView {
        let info = steps.get(self.index).copied();
        StepView {
            index: self.index,
            count: self.len,
            title: info.map(|s| s.title).unwrap_or(""),
            description: info.map(|s| s.description).unwrap_or(""),
        }
    }
}

/// Current step as reported in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub index: usize,
    pub count: usize,
    pub title: &'static str,
    pub description: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_stops_on_last_step() {
        let mut c = StepCursor::new(3);
        assert!(c.advance());
        assert!(c.advance());
        assert!(c.is_last());
        assert!(!c.advance());
        assert_eq!(c.index(), 2);
        c.reset();
        assert_eq!(c.index(), 0);
    }

    #[test]
    fn jump_is_bounded() {
        let mut c = StepCursor::new(8);
        c.jump_to(5);
        assert_eq!(c.index(), 5);
        c.jump_to(40);
        assert_eq!(c.index(), 7);
    }

    #[test]
    fn view_reports_titles() {
        const STEPS: &[StepInfo] = &[
            StepInfo { title: "a", description: "first" },
            StepInfo { title: "b", description: "second" },
        ];
        let mut c = StepCursor::new(STEPS.len());
        c.advance();
        let v = c.view(STEPS);
        assert_eq!(v.index, 1);
        assert_eq!(v.count, 2);
        assert_eq!(v.title, "b");
    }
}
