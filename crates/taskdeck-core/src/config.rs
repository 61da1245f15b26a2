use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::view::{
  SortKey,
  ViewSelector
};

pub const RC_ENV: &str = "TASKDECKRC";
const RC_FILE_NAME: &str =
  ".taskdeckrc";
const DATA_DIR_NAME: &str =
  ".taskdeck";

pub const KNOWN_KEYS: [&str; 5] = [
  "data.location",
  "color",
  "timezone",
  "default.view",
  "default.sort"
];

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("data.location", "~/.taskdeck"),
      ("color", "on"),
      ("default.view", "all"),
      ("default.sort", "date-desc")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading config");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no config file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  /// `--rc key=value` pairs; each
  /// goes through [`Config::set`].
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      debug!(key = %key, value = %value, "applying override");
      self
        .set(&key, &value)
        .with_context(|| {
          format!("invalid --rc {key}")
        })?;
    }
    Ok(())
  }

  /// Rejects keys taskdeck does not
  /// read and values it cannot use.
  pub fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    let key = key.trim();
    let value = value.trim();
    match key {
      | "color" => {
        if parse_bool(value).is_none() {
          return Err(anyhow!(
            "color must be on or off, \
             got {value:?}"
          ));
        }
      }
      | "timezone" => {
        if !value
          .eq_ignore_ascii_case("local")
          && value.parse::<Tz>().is_err()
        {
          return Err(anyhow!(
            "unknown timezone {value:?}"
          ));
        }
      }
      | "default.sort" => {
        if SortKey::parse(value).as_str()
          != value
        {
          return Err(anyhow!(
            "unknown sort key {value:?}"
          ));
        }
      }
      | "default.view" => {
        if value != "all"
          && ViewSelector::parse(value)
            == ViewSelector::All
        {
          return Err(anyhow!(
            "unknown view {value:?}"
          ));
        }
      }
      | "data.location" => {
        if value.is_empty() {
          return Err(anyhow!(
            "data.location cannot be \
             empty"
          ));
        }
      }
      | other => {
        return Err(anyhow!(
          "unknown config key {other:?} \
           (expected one of {})",
          KNOWN_KEYS.join(", ")
        ));
      }
    }

    self
      .map
      .insert(key.to_string(), value.to_string());
    Ok(())
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .and_then(|v| parse_bool(v))
  }

  /// Sorted by key.
  pub fn entries(
    &self
  ) -> Vec<(&String, &String)> {
    let mut entries: Vec<_> =
      self.map.iter().collect();
    entries.sort();
    entries
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      // colors such as `#4f46e5` are
      // only comments after whitespace
      if let Some((before, _)) =
        line.split_once(" #")
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if self
          .loaded_files
          .contains(&include_path)
        {
          warn!(include = %include_path.display(), "include cycle; skipping");
        } else if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      trace!(key = %k.trim(), value = %v.trim(), "loaded config key");
      self.set(k, v).with_context(|| {
        format!(
          "{}:{}",
          path.display(),
          line_num + 1
        )
      })?;
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping config"
    );
    return Ok(None);
  };
  let candidate =
    home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(DATA_DIR_NAME))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  s: &str
) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "yes" | "on" | "true" => {
      Some(true)
    }
    | "0" | "no" | "off" | "false" => {
      Some(false)
    }
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::{
    Config,
    resolve_data_dir
  };

  #[test]
  fn defaults_are_present() {
    let cfg = Config::default();
    assert_eq!(
      cfg.get("default.sort").as_deref(),
      Some("date-desc")
    );
    assert_eq!(
      cfg.get_bool("color"),
      Some(true)
    );
    assert_eq!(cfg.get("timezone"), None);
  }

  #[test]
  fn file_values_includes_and_overrides()
   {
    let temp =
      tempdir().expect("tempdir");
    let extra = temp.path().join("extra");
    fs::write(
      &extra,
      "timezone = Asia/Tokyo\n"
    )
    .unwrap();
    let rc = temp.path().join("rc");
    fs::write(
      &rc,
      "# comment\n\
       color = off\n\
       default.view = today # trailing\n\
       include extra\n"
    )
    .unwrap();

    let mut cfg =
      Config::load(Some(&rc)).unwrap();
    assert_eq!(
      cfg.get_bool("color"),
      Some(false)
    );
    assert_eq!(
      cfg.get("default.view").as_deref(),
      Some("today")
    );
    assert_eq!(
      cfg.get("timezone").as_deref(),
      Some("Asia/Tokyo")
    );
    assert_eq!(cfg.loaded_files.len(), 2);

    cfg
      .apply_overrides([(
        "color".to_string(),
        "on".to_string()
      )])
      .unwrap();
    assert_eq!(
      cfg.get_bool("color"),
      Some(true)
    );
  }

  #[test]
  fn invalid_line_is_an_error() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    fs::write(&rc, "not a setting\n")
      .unwrap();
    assert!(
      Config::load(Some(&rc)).is_err()
    );
  }

  #[test]
  fn unknown_keys_and_bad_values_are_rejected()
   {
    let mut cfg = Config::default();
    assert!(
      cfg.set("colour", "on").is_err()
    );
    assert!(
      cfg.set("color", "maybe").is_err()
    );
    assert!(
      cfg
        .set("timezone", "Mars/Base")
        .is_err()
    );
    assert!(
      cfg
        .set("default.sort", "newest-ish")
        .is_err()
    );
    assert!(
      cfg
        .set("default.view", "someday")
        .is_err()
    );
    assert_eq!(
      cfg.get_bool("color"),
      Some(true)
    );

    cfg.set("timezone", "local").unwrap();
    cfg
      .set("default.view", "category:Work")
      .unwrap();
    cfg
      .set("default.sort", "priority-low")
      .unwrap();
    assert!(
      cfg
        .apply_overrides([(
          "rc.color".to_string(),
          "off".to_string()
        )])
        .is_err()
    );
  }

  #[test]
  fn unknown_key_in_file_names_the_line() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    fs::write(
      &rc,
      "color = off\nshell = zsh\n"
    )
    .unwrap();
    let err = Config::load(Some(&rc))
      .unwrap_err();
    assert!(
      format!("{err:#}").contains(":2")
    );
  }

  #[test]
  fn data_dir_override_is_created() {
    let temp =
      tempdir().expect("tempdir");
    let target =
      temp.path().join("nested/data");
    let dir = resolve_data_dir(
      &Config::default(),
      Some(&target)
    )
    .unwrap();
    assert_eq!(dir, target);
    assert!(target.is_dir());
  }
}
