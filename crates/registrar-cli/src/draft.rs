//! JSON-file draft persistence for the wizard.

use std::{
  fs, io,
  marker::PhantomData,
  path::{Path, PathBuf},
};

use registrar_core::form::DraftStore;
use serde::{Serialize, de::DeserializeOwned};

/// Stores one draft as a JSON file. Every failure is logged and swallowed.
#[derive(Debug)]
pub struct FileDraftStore<D> {
  path:  PathBuf,
  _kind: PhantomData<fn() -> D>,
}

impl<D> FileDraftStore<D> {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), _kind: PhantomData }
  }

  pub fn path(&self) -> &Path { &self.path }
}

impl<D: Serialize + DeserializeOwned> DraftStore<D> for FileDraftStore<D> {
  fn load(&self) -> Option<D> {
    let raw = match fs::read_to_string(&self.path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
      Err(e) => {
        tracing::warn!(path = %self.path.display(), error = %e, "could not read draft");
        return None;
      }
    };
    match serde_json::from_str(&raw) {
      Ok(draft) => {
        tracing::debug!(path = %self.path.display(), "draft resumed");
        Some(draft)
      }
      Err(e) => {
        tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable draft");
        None
      }
    }
  }

  fn save(&self, draft: &D) {
    let json = match serde_json::to_string_pretty(draft) {
      Ok(json) => json,
      Err(e) => {
        tracing::warn!(error = %e, "could not serialise draft");
        return;
      }
    };
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
      && let Err(e) = fs::create_dir_all(parent)
    {
      tracing::warn!(path = %parent.display(), error = %e, "could not create draft directory");
      return;
    }
    if let Err(e) = fs::write(&self.path, json) {
      tracing::warn!(path = %self.path.display(), error = %e, "could not save draft");
    }
  }

  fn clear(&self) {
    match fs::remove_file(&self.path) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "could not remove draft"),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::{SystemTime, UNIX_EPOCH};

  use registrar_core::inscription::NewInscription;

  use super::*;

  fn scratch_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("registrar-{name}-{}-{nanos}", std::process::id()))
  }

  #[test]
  fn save_load_clear() {
    let dir = scratch_dir("draft");
    let store = FileDraftStore::<NewInscription>::new(dir.join("nested/inscription.json"));
    assert!(store.load().is_none());

    let draft = NewInscription { first_name: "Awa".into(), ..Default::default() };
    store.save(&draft);
    assert_eq!(store.load().unwrap().first_name, "Awa");

    store.clear();
    assert!(store.load().is_none());
    store.clear();

    fs::remove_dir_all(dir).ok();
  }

  #[test]
  fn corrupt_file_is_ignored() {
    let dir = scratch_dir("corrupt");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("draft.json");
    fs::write(&path, "{ not json").unwrap();

    let store = FileDraftStore::<NewInscription>::new(&path);
    assert!(store.load().is_none());

    fs::remove_dir_all(dir).ok();
  }
}
