//! Line-oriented enrolment wizard over [`MultiStepForm`].
//!
//! Each step asks its fields in turn; an empty answer keeps the current value
//! and `-` clears an optional one. Every accepted answer goes through
//! [`MultiStepForm::update`], so the draft store always holds the latest
//! state and an interrupted session resumes where it stopped.

use std::io::{self, BufRead, Write};

use chrono::NaiveDate;
use registrar_core::{
  catalog::{ExamType, Formation},
  examen::ExamenRequest,
  form::{DraftStore, MultiStepForm},
  inscription::{FundingMode, Location, NewInscription},
  validate::describe,
};
use validator::Validate;

// ─── Console ─────────────────────────────────────────────────────────────────

pub trait Console {
  /// Print `prompt` and read one line. `None` at end of input.
  fn ask(&mut self, prompt: &str) -> io::Result<Option<String>>;
  fn say(&mut self, text: &str) -> io::Result<()>;
}

pub struct LineConsole<R, W> {
  reader: R,
  writer: W,
}

impl<R, W> LineConsole<R, W> {
  pub fn new(reader: R, writer: W) -> Self { Self { reader, writer } }

  pub fn into_writer(self) -> W { self.writer }
}

impl<R: BufRead, W: Write> Console for LineConsole<R, W> {
  fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
    write!(self.writer, "{prompt}")?;
    self.writer.flush()?;
    let mut line = String::new();
    if self.reader.read_line(&mut line)? == 0 {
      return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_owned()))
  }

  fn say(&mut self, text: &str) -> io::Result<()> { writeln!(self.writer, "{text}") }
}

// ─── Steps ───────────────────────────────────────────────────────────────────

pub const INSCRIPTION_STEPS: [&str; 5] =
  ["Identity", "Contact", "Training", "Availability and funding", "Review"];

const INSCRIPTION_FIELDS: [&[&str]; 5] = [
  &["civility", "first_name", "last_name", "birth_date"],
  &["email", "phone", "address", "postal_code", "city"],
  &["formation_id", "location"],
  &["availabilities", "funding_mode"],
  &[],
];

pub const EXAMEN_STEPS: [&str; 3] = ["Identity", "Contact", "Review"];

const EXAMEN_FIELDS: [&[&str]; 3] =
  [&["first_name", "last_name", "exam_type_id"], &["email", "phone"], &[]];

/// Validation messages for `fields`, or for every field when `fields` is
/// empty.
pub fn step_errors<D: Validate>(draft: &D, fields: &[&str]) -> Vec<String> {
  let Err(errors) = draft.validate() else {
    return Vec::new();
  };
  describe(&errors)
    .into_iter()
    .filter(|message| {
      fields.is_empty()
        || message
          .split_once(':')
          .is_some_and(|(field, _)| fields.contains(&field))
    })
    .collect()
}

/// How a wizard run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// The review step was confirmed with a valid draft.
  Submit,
  /// The user quit or input ended; the draft is kept.
  Quit,
}

// ─── Driver ──────────────────────────────────────────────────────────────────

fn drive<C, D, P>(
  console: &mut C,
  form: &mut MultiStepForm<D, P>,
  titles: &[&str],
  fields: &[&[&str]],
  mut fill: impl FnMut(&mut C, &mut MultiStepForm<D, P>) -> io::Result<bool>,
  summary: impl Fn(&D) -> Vec<String>,
) -> io::Result<Outcome>
where
  C: Console,
  D: Default + Validate,
  P: DraftStore<D>,
{
  loop {
    let step = form.step();
    let title = titles.get(step - 1).copied().unwrap_or("");
    console.say(&format!(
      "\n[{step}/{}] {title} ({}%)",
      form.total_steps(),
      form.progress()
    ))?;

    if form.is_last() {
      for line in summary(form.draft()) {
        console.say(&format!("  {line}"))?;
      }
      let errors = step_errors(form.draft(), &[]);
      for error in &errors {
        console.say(&format!("  ! {error}"))?;
      }
      let Some(command) = console.ask("[Enter] submit, b: back, r: restart, q: quit > ")? else {
        return Ok(Outcome::Quit);
      };
      match command.trim() {
        "" if errors.is_empty() => return Ok(Outcome::Submit),
        "" => console.say("Go back and fix the fields above.")?,
        "b" => {
          form.previous();
        }
        "r" => form.reset(),
        "q" => return Ok(Outcome::Quit),
        other => console.say(&format!("unknown command {other:?}"))?,
      }
      continue;
    }

    if !fill(console, form)? {
      return Ok(Outcome::Quit);
    }

    let Some(command) = console.ask("[Enter] next, b: back, q: quit > ")? else {
      return Ok(Outcome::Quit);
    };
    match command.trim() {
      "" => {
        let step_fields = fields.get(step - 1).copied().unwrap_or(&[]);
        let advanced = form.try_next(|_, draft| {
          let errors = step_errors(draft, step_fields);
          if errors.is_empty() { Ok(()) } else { Err(errors) }
        });
        if let Err(errors) = advanced {
          for error in errors {
            console.say(&format!("  ! {error}"))?;
          }
        }
      }
      "b" => {
        form.previous();
      }
      "q" => return Ok(Outcome::Quit),
      other => console.say(&format!("unknown command {other:?}"))?,
    }
  }
}

// ─── Field prompts ───────────────────────────────────────────────────────────

enum Answer<T> {
  Keep,
  Set(T),
  Eof,
}

fn ask_field<C: Console, T>(
  console: &mut C,
  label: &str,
  current: &str,
  parse: impl Fn(&str) -> Result<T, String>,
) -> io::Result<Answer<T>> {
  let prompt =
    if current.is_empty() { format!("{label}: ") } else { format!("{label} [{current}]: ") };
  loop {
    let Some(line) = console.ask(&prompt)? else {
      return Ok(Answer::Eof);
    };
    let line = line.trim();
    if line.is_empty() {
      return Ok(Answer::Keep);
    }
    match parse(line) {
      Ok(value) => return Ok(Answer::Set(value)),
      Err(message) => console.say(&format!("  ! {message}"))?,
    }
  }
}

/// Ask one field and store the answer. `false` once input has ended.
fn edit<C, D, P, T>(
  console: &mut C,
  form: &mut MultiStepForm<D, P>,
  label: &str,
  current: impl Fn(&D) -> String,
  parse: impl Fn(&str) -> Result<T, String>,
  apply: impl FnOnce(&mut D, T),
) -> io::Result<bool>
where
  C: Console,
  D: Default,
  P: DraftStore<D>,
{
  let shown = current(form.draft());
  match ask_field(console, label, &shown, parse)? {
    Answer::Eof => Ok(false),
    Answer::Keep => Ok(true),
    Answer::Set(value) => {
      form.update(|draft| apply(draft, value));
      Ok(true)
    }
  }
}

fn text(input: &str) -> Result<String, String> { Ok(input.to_owned()) }

fn optional_text(input: &str) -> Result<Option<String>, String> {
  Ok((input != "-").then(|| input.to_owned()))
}

fn birth_date(input: &str) -> Result<Option<NaiveDate>, String> {
  if input == "-" {
    return Ok(None);
  }
  NaiveDate::parse_from_str(input, "%d/%m/%Y")
    .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
    .map(Some)
    .map_err(|_| "expected a date such as 14/07/1990".to_owned())
}

const LOCATIONS: [Location; 2] = [Location::Gagny, Location::Sarcelles];

fn location(input: &str) -> Result<Option<Location>, String> {
  if input == "-" {
    return Ok(None);
  }
  LOCATIONS
    .into_iter()
    .find(|l| l.as_ref().eq_ignore_ascii_case(input))
    .map(Some)
    .ok_or_else(|| "expected Gagny or Sarcelles".to_owned())
}

const FUNDING_MODES: [FundingMode; 5] = [
  FundingMode::Personnel,
  FundingMode::Cpf,
  FundingMode::FranceTravail,
  FundingMode::Entreprise,
  FundingMode::Autre,
];

fn funding_mode(input: &str) -> Result<FundingMode, String> {
  FUNDING_MODES
    .into_iter()
    .find(|m| m.as_ref().eq_ignore_ascii_case(input))
    .ok_or_else(|| {
      let known: Vec<&str> = FUNDING_MODES.iter().map(AsRef::as_ref).collect();
      format!("expected one of {}", known.join(", "))
    })
}

fn availabilities(input: &str) -> Result<Vec<String>, String> {
  if input == "-" {
    return Ok(Vec::new());
  }
  Ok(
    input
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_owned)
      .collect(),
  )
}

/// A 1-based pick from a numbered list, or `-` for none.
fn pick(input: &str, ids: &[i64]) -> Result<Option<i64>, String> {
  if input == "-" {
    return Ok(None);
  }
  input
    .parse::<usize>()
    .ok()
    .and_then(|n| n.checked_sub(1))
    .and_then(|i| ids.get(i).copied())
    .map(Some)
    .ok_or_else(|| format!("expected a number between 1 and {}", ids.len()))
}

// ─── Inscription ─────────────────────────────────────────────────────────────

fn formation_name(formations: &[Formation], id: Option<i64>) -> String {
  id.and_then(|id| formations.iter().find(|f| f.id == id))
    .map(|f| f.name.clone())
    .unwrap_or_default()
}

fn fill_inscription<C, P>(
  console: &mut C,
  form: &mut MultiStepForm<NewInscription, P>,
  formations: &[Formation],
) -> io::Result<bool>
where
  C: Console,
  P: DraftStore<NewInscription>,
{
  match form.step() {
    1 => Ok(
      edit(console, form, "Civility (- to clear)", |d| d.civility.clone().unwrap_or_default(), optional_text, |d, v| d.civility = v)?
        && edit(console, form, "First name", |d| d.first_name.clone(), text, |d, v| d.first_name = v)?
        && edit(console, form, "Last name", |d| d.last_name.clone(), text, |d, v| d.last_name = v)?
        && edit(
          console,
          form,
          "Birth date (dd/mm/yyyy, - to clear)",
          |d| d.birth_date.map(|b| b.format("%d/%m/%Y").to_string()).unwrap_or_default(),
          birth_date,
          |d, v| d.birth_date = v,
        )?,
    ),
    2 => Ok(
      edit(console, form, "Email", |d| d.email.clone(), text, |d, v| d.email = v)?
        && edit(console, form, "Phone", |d| d.phone.clone(), text, |d, v| d.phone = v)?
        && edit(console, form, "Address (- to clear)", |d| d.address.clone().unwrap_or_default(), optional_text, |d, v| d.address = v)?
        && edit(console, form, "Postal code", |d| d.postal_code.clone(), text, |d, v| d.postal_code = v)?
        && edit(console, form, "City", |d| d.city.clone(), text, |d, v| d.city = v)?,
    ),
    3 => {
      for (n, f) in formations.iter().enumerate() {
        console.say(&format!("  {}. {} ({}, {} €)", n + 1, f.name, f.duration, f.price))?;
      }
      let ids: Vec<i64> = formations.iter().map(|f| f.id).collect();
      Ok(
        edit(
          console,
          form,
          "Formation (number, - for none)",
          |d| formation_name(formations, d.formation_id),
          |s| pick(s, &ids),
          |d, v| d.formation_id = v,
        )?
          && edit(
            console,
            form,
            "Centre (Gagny/Sarcelles)",
            |d| d.location.map(|l| l.to_string()).unwrap_or_default(),
            location,
            |d, v| d.location = v,
          )?,
      )
    }
    4 => Ok(
      edit(
        console,
        form,
        "Availabilities (comma-separated, - to clear)",
        |d| d.availabilities.join(", "),
        availabilities,
        |d, v| d.availabilities = v,
      )?
        && edit(
          console,
          form,
          "Funding (personnel, cpf, france_travail, entreprise, autre)",
          |d| d.funding_mode.to_string(),
          funding_mode,
          |d, v| d.funding_mode = v,
        )?,
    ),
    _ => Ok(true),
  }
}

fn inscription_summary(d: &NewInscription, formations: &[Formation]) -> Vec<String> {
  let civility = d.civility.as_deref().map(|c| format!("{c} ")).unwrap_or_default();
  let mut lines = vec![
    format!("Name:           {civility}{} {}", d.first_name, d.last_name),
    format!("Email:          {}", d.email),
    format!("Phone:          {}", d.phone),
    format!(
      "Address:        {}{} {}",
      d.address.as_deref().map(|a| format!("{a}, ")).unwrap_or_default(),
      d.postal_code,
      d.city
    ),
    format!("Formation:      {}", formation_name(formations, d.formation_id)),
    format!("Centre:         {}", d.location.map(|l| l.to_string()).unwrap_or_default()),
    format!("Availabilities: {}", d.availabilities.join(", ")),
    format!("Funding:        {}", d.funding_mode),
  ];
  if let Some(born) = d.birth_date {
    lines.insert(1, format!("Born:           {}", born.format("%d/%m/%Y")));
  }
  lines
}

/// Walk the training registration form.
pub fn run_inscription<C, P>(
  console: &mut C,
  form: &mut MultiStepForm<NewInscription, P>,
  formations: &[Formation],
) -> io::Result<Outcome>
where
  C: Console,
  P: DraftStore<NewInscription>,
{
  drive(
    console,
    form,
    &INSCRIPTION_STEPS,
    &INSCRIPTION_FIELDS,
    |console, form| fill_inscription(console, form, formations),
    |d| inscription_summary(d, formations),
  )
}

// ─── Examen ──────────────────────────────────────────────────────────────────

fn exam_type_label(types: &[ExamType], id: Option<i64>) -> String {
  id.and_then(|id| types.iter().find(|t| t.id == id))
    .map(|t| t.label.clone())
    .unwrap_or_default()
}

fn fill_examen<C, P>(
  console: &mut C,
  form: &mut MultiStepForm<ExamenRequest, P>,
  types: &[ExamType],
) -> io::Result<bool>
where
  C: Console,
  P: DraftStore<ExamenRequest>,
{
  match form.step() {
    1 => {
      if !(edit(console, form, "First name", |d| d.first_name.clone(), text, |d, v| d.first_name = v)?
        && edit(console, form, "Last name", |d| d.last_name.clone(), text, |d, v| d.last_name = v)?)
      {
        return Ok(false);
      }
      for (n, t) in types.iter().enumerate() {
        console.say(&format!("  {}. {}", n + 1, t.label))?;
      }
      let ids: Vec<i64> = types.iter().map(|t| t.id).collect();
      edit(
        console,
        form,
        "Exam (number, - for none)",
        |d| exam_type_label(types, d.exam_type_id),
        |s| pick(s, &ids),
        |d, v| d.exam_type_id = v,
      )
    }
    2 => Ok(
      edit(console, form, "Email", |d| d.email.clone(), text, |d, v| d.email = v)?
        && edit(console, form, "Phone", |d| d.phone.clone(), text, |d, v| d.phone = v)?,
    ),
    _ => Ok(true),
  }
}

/// Walk the exam registration form.
pub fn run_examen<C, P>(
  console: &mut C,
  form: &mut MultiStepForm<ExamenRequest, P>,
  types: &[ExamType],
) -> io::Result<Outcome>
where
  C: Console,
  P: DraftStore<ExamenRequest>,
{
  drive(
    console,
    form,
    &EXAMEN_STEPS,
    &EXAMEN_FIELDS,
    |console, form| fill_examen(console, form, types),
    |d| {
      vec![
        format!("Name:  {} {}", d.first_name, d.last_name),
        format!("Email: {}", d.email),
        format!("Phone: {}", d.phone),
        format!("Exam:  {}", exam_type_label(types, d.exam_type_id)),
      ]
    },
  )
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use registrar_core::form::MemoryDraftStore;

  use super::*;

  fn console(lines: &[&str]) -> LineConsole<Cursor<Vec<u8>>, Vec<u8>> {
    let mut input = lines.join("\n");
    input.push('\n');
    LineConsole::new(Cursor::new(input.into_bytes()), Vec::new())
  }

  fn output(console: LineConsole<Cursor<Vec<u8>>, Vec<u8>>) -> String {
    String::from_utf8(console.into_writer()).unwrap()
  }

  fn formations() -> Vec<Formation> {
    vec![
      Formation {
        id:       7,
        name:     "Agent de sécurité".into(),
        duration: "175h".into(),
        price:    1900,
        position: 0,
        visible:  true,
      },
      Formation {
        id:       9,
        name:     "SST".into(),
        duration: "14h".into(),
        price:    250,
        position: 1,
        visible:  true,
      },
    ]
  }

  #[test]
  fn walks_the_inscription_form() {
    let store = MemoryDraftStore::new();
    let mut form = MultiStepForm::new(INSCRIPTION_STEPS.len(), &store);
    let mut io = console(&[
      // Identity
      "Mme", "Awa", "Traoré", "14/07/1990", "",
      // Contact
      "awa@example.fr", "06 12 34 56 78", "3 rue de la Paix", "93220", "Gagny", "",
      // Training
      "2", "sarcelles", "",
      // Availability and funding
      "lundi, mardi soir", "cpf", "",
      // Review
      "",
    ]);

    let outcome = run_inscription(&mut io, &mut form, &formations()).unwrap();
    assert_eq!(outcome, Outcome::Submit);

    let draft = form.draft();
    assert_eq!(draft.civility.as_deref(), Some("Mme"));
    assert_eq!(draft.birth_date, NaiveDate::from_ymd_opt(1990, 7, 14));
    assert_eq!(draft.formation_id, Some(9));
    assert_eq!(draft.location, Some(Location::Sarcelles));
    assert_eq!(draft.availabilities, vec!["lundi", "mardi soir"]);
    assert_eq!(draft.funding_mode, FundingMode::Cpf);
    // Every answer was mirrored to the store.
    assert_eq!(store.load().unwrap().city, "Gagny");

    let out = output(io);
    assert!(out.contains("[5/5] Review (100%)"), "{out}");
    assert!(out.contains("SST"), "{out}");
  }

  #[test]
  fn invalid_step_is_not_left() {
    let store = MemoryDraftStore::new();
    let mut form = MultiStepForm::new(INSCRIPTION_STEPS.len(), &store);
    let mut io = console(&[
      "", "", "Traoré", "", "",
      // Still on step 1: fill in the missing name.
      "", "Awa", "", "", "",
    ]);

    let outcome = run_inscription(&mut io, &mut form, &formations()).unwrap();
    assert_eq!(outcome, Outcome::Quit);
    assert_eq!(form.step(), 2);

    let out = output(io);
    assert!(out.contains("first_name"), "{out}");
    assert!(!out.contains("email"), "{out}");
  }

  #[test]
  fn unparseable_answers_are_asked_again() {
    let store = MemoryDraftStore::new();
    let mut form = MultiStepForm::new(INSCRIPTION_STEPS.len(), &store);
    form.go_to_step(3);
    let mut io = console(&["12", "1", "Paris", "Gagny"]);

    run_inscription(&mut io, &mut form, &formations()).unwrap();
    assert_eq!(form.draft().formation_id, Some(7));
    assert_eq!(form.draft().location, Some(Location::Gagny));
    let out = output(io);
    assert!(out.contains("between 1 and 2"), "{out}");
    assert!(out.contains("Gagny or Sarcelles"), "{out}");
  }

  #[test]
  fn back_and_resume() {
    let store = MemoryDraftStore::new();
    {
      let mut form = MultiStepForm::new(INSCRIPTION_STEPS.len(), &store);
      let mut io = console(&["", "Awa", "Traoré", "", "", "awa@example.fr", "", "", "", "", "b"]);
      assert_eq!(run_inscription(&mut io, &mut form, &[]).unwrap(), Outcome::Quit);
      assert_eq!(form.step(), 1);
    }

    // A new session starts at step 1 with the saved answers.
    let form = MultiStepForm::new(INSCRIPTION_STEPS.len(), &store);
    assert_eq!(form.step(), 1);
    assert_eq!(form.draft().email, "awa@example.fr");
  }

  #[test]
  fn review_refuses_an_invalid_draft() {
    let store = MemoryDraftStore::new();
    let mut form = MultiStepForm::new(EXAMEN_STEPS.len(), &store);
    form.go_to_step(3);
    let mut io = console(&["", "q"]);

    assert_eq!(run_examen(&mut io, &mut form, &[]).unwrap(), Outcome::Quit);
    let out = output(io);
    assert!(out.contains("fix the fields"), "{out}");
  }

  #[test]
  fn walks_the_exam_form() {
    let store = MemoryDraftStore::new();
    let mut form = MultiStepForm::new(EXAMEN_STEPS.len(), &store);
    let types = vec![ExamType {
      id:       3,
      code:     "TCF".into(),
      label:    "TCF IRN".into(),
      position: 0,
      visible:  true,
      options:  vec![],
    }];
    let mut io = console(&[
      "Karim", "Benali", "1", "",
      "karim@example.fr", "+33 6 98 76 54 32", "",
      "",
    ]);

    assert_eq!(run_examen(&mut io, &mut form, &types).unwrap(), Outcome::Submit);
    assert_eq!(form.draft().exam_type_id, Some(3));
    assert_eq!(form.finish().email, "karim@example.fr");
    assert!(store.load().is_none());
  }

  #[test]
  fn step_errors_filters_by_field() {
    let draft = NewInscription { first_name: "Awa".into(), ..Default::default() };
    let identity = step_errors(&draft, INSCRIPTION_FIELDS[0]);
    assert_eq!(identity.len(), 1);
    assert!(identity[0].starts_with("last_name"));
    assert!(step_errors(&draft, &[]).len() > identity.len());
  }
}
