//! Multi-step form state and the persisted-draft abstraction.
//!
//! The step counter is the only navigation state and always lies in
//! `[1, total_steps]`. Answers live in a draft that is mirrored to a
//! [`DraftStore`] on every change and read back once when the form is built,
//! so an abandoned session can be resumed.

use std::sync::Mutex;

/// Best-effort persistence for an in-progress draft.
///
/// Implementations never fail from the caller's point of view: a lost write
/// only means the draft will not be resumed. Failures should be logged.
pub trait DraftStore<D> {
  fn load(&self) -> Option<D>;
  fn save(&self, draft: &D);
  fn clear(&self);
}

/// Keeps the draft in process memory.
#[derive(Debug, Default)]
pub struct MemoryDraftStore<D> {
  slot: Mutex<Option<D>>,
}

impl<D> MemoryDraftStore<D> {
  pub fn new() -> Self { Self { slot: Mutex::new(None) } }
}

impl<D: Clone> DraftStore<D> for MemoryDraftStore<D> {
  fn load(&self) -> Option<D> {
    match self.slot.lock() {
      Ok(slot) => slot.clone(),
      Err(_) => {
        tracing::warn!("draft store lock poisoned; starting from an empty draft");
        None
      }
    }
  }

  fn save(&self, draft: &D) {
    match self.slot.lock() {
      Ok(mut slot) => *slot = Some(draft.clone()),
      Err(_) => tracing::warn!("draft store lock poisoned; draft not saved"),
    }
  }

  fn clear(&self) {
    if let Ok(mut slot) = self.slot.lock() {
      *slot = None;
    }
  }
}

impl<D, P: DraftStore<D> + ?Sized> DraftStore<D> for &P {
  fn load(&self) -> Option<D> { (**self).load() }

  fn save(&self, draft: &D) { (**self).save(draft) }

  fn clear(&self) { (**self).clear() }
}

/// A form split into `total_steps` pages over a draft of type `D`.
#[derive(Debug)]
pub struct MultiStepForm<D, P> {
  step:        usize,
  total_steps: usize,
  draft:       D,
  store:       P,
}

impl<D, P> MultiStepForm<D, P>
where
  D: Default,
  P: DraftStore<D>,
{
  /// Build a form at step 1, resuming any draft the store holds.
  /// A form always has at least one step.
  pub fn new(total_steps: usize, store: P) -> Self {
    let draft = store.load().unwrap_or_default();
    Self { step: 1, total_steps: total_steps.max(1), draft, store }
  }

  pub fn step(&self) -> usize { self.step }

  pub fn total_steps(&self) -> usize { self.total_steps }

  pub fn is_first(&self) -> bool { self.step == 1 }

  pub fn is_last(&self) -> bool { self.step == self.total_steps }

  /// Completion in percent, derived from the step counter only.
  pub fn progress(&self) -> u8 {
    // step <= total_steps, so the quotient is at most 100.
    u8::try_from(self.step * 100 / self.total_steps).unwrap_or(100)
  }

  /// Advance one step, staying on the last one.
  pub fn next(&mut self) -> usize {
    self.step = (self.step + 1).min(self.total_steps);
    self.step
  }

  /// Go back one step, staying on the first one.
  pub fn previous(&mut self) -> usize {
    self.step = self.step.saturating_sub(1).max(1);
    self.step
  }

  /// Jump to `step`. Out-of-range targets are refused and leave the counter
  /// unchanged.
  pub fn go_to_step(&mut self, step: usize) -> bool {
    if (1..=self.total_steps).contains(&step) {
      self.step = step;
      true
    } else {
      false
    }
  }

  /// Advance only if `validate` accepts the draft for the current step.
  pub fn try_next<E>(
    &mut self,
    validate: impl FnOnce(usize, &D) -> Result<(), E>,
  ) -> Result<usize, E> {
    validate(self.step, &self.draft)?;
    Ok(self.next())
  }

  pub fn draft(&self) -> &D { &self.draft }

  /// Apply a change to the draft and persist it.
  pub fn update(&mut self, change: impl FnOnce(&mut D)) {
    change(&mut self.draft);
    self.store.save(&self.draft);
  }

  /// Back to step 1 with an empty draft; the stored draft is discarded.
  pub fn reset(&mut self) {
    self.step = 1;
    self.draft = D::default();
    self.store.clear();
  }

  /// Consume the form, discarding the stored draft, and return the answers.
  pub fn finish(self) -> D {
    self.store.clear();
    self.draft
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, Default, PartialEq)]
  struct Answers {
    name:  String,
    email: String,
  }

  #[test]
  fn counter_stays_in_bounds() {
    let store = MemoryDraftStore::<Answers>::new();
    let mut form = MultiStepForm::new(3, &store);

    for _ in 0..5 {
      form.previous();
      assert_eq!(form.step(), 1);
    }
    for _ in 0..10 {
      form.next();
      assert!((1..=3).contains(&form.step()));
    }
    assert_eq!(form.step(), 3);
    assert!(form.is_last());

    // An arbitrary interleaving never escapes the range.
    let pattern = [true, false, false, true, true, true, false, true, false, false, false];
    for forward in pattern {
      if forward { form.next() } else { form.previous() };
      assert!((1..=form.total_steps()).contains(&form.step()));
    }
  }

  #[test]
  fn go_to_step_refuses_out_of_range() {
    let store = MemoryDraftStore::<Answers>::new();
    let mut form = MultiStepForm::new(4, &store);
    assert!(form.go_to_step(3));
    assert_eq!(form.step(), 3);
    assert!(!form.go_to_step(0));
    assert!(!form.go_to_step(5));
    assert_eq!(form.step(), 3);
  }

  #[test]
  fn zero_steps_means_one() {
    let store = MemoryDraftStore::<Answers>::new();
    let mut form = MultiStepForm::new(0, &store);
    assert_eq!(form.total_steps(), 1);
    assert_eq!(form.next(), 1);
    assert_eq!(form.progress(), 100);
  }

  #[test]
  fn progress_follows_counter() {
    let store = MemoryDraftStore::<Answers>::new();
    let mut form = MultiStepForm::new(4, &store);
    assert_eq!(form.progress(), 25);
    form.next();
    assert_eq!(form.progress(), 50);
    form.go_to_step(4);
    assert_eq!(form.progress(), 100);
  }

  #[test]
  fn try_next_is_gated_by_validation() {
    let store = MemoryDraftStore::<Answers>::new();
    let mut form = MultiStepForm::new(2, &store);
    let needs_name = |_: usize, a: &Answers| {
      if a.name.is_empty() { Err("name required") } else { Ok(()) }
    };

    assert_eq!(form.try_next(needs_name), Err("name required"));
    assert_eq!(form.step(), 1);

    form.update(|a| a.name = "Awa".into());
    assert_eq!(form.try_next(needs_name), Ok(2));
  }

  #[test]
  fn draft_is_saved_and_resumed() {
    let store = MemoryDraftStore::<Answers>::new();
    {
      let mut form = MultiStepForm::new(2, &store);
      form.update(|a| a.email = "awa@example.fr".into());
    }
    let resumed = MultiStepForm::new(2, &store);
    assert_eq!(resumed.draft().email, "awa@example.fr");
    assert_eq!(resumed.step(), 1);
  }

  #[test]
  fn reset_and_finish_clear_the_store() {
    let store = MemoryDraftStore::<Answers>::new();
    let mut form = MultiStepForm::new(3, &store);
    form.update(|a| a.name = "Awa".into());
    form.next();
    form.reset();
    assert_eq!(form.step(), 1);
    assert_eq!(form.draft(), &Answers::default());
    assert!(store.load().is_none());

    form.update(|a| a.name = "Inès".into());
    let answers = form.finish();
    assert_eq!(answers.name, "Inès");
    assert!(store.load().is_none());
  }
}
