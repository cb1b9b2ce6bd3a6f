//! Persisted page theme (`[theme]` table of a TOML config file).
//!
//! The file is shared by every generation in the process. Writes go through
//! [`ThemeFile::update`], which holds a lock for the whole read-modify-write
//! and replaces the file atomically. Keys other than the two colors are kept.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::Serialize;
use toml::{Table, Value};

/// Serializes read-modify-write cycles within this process.
static LOCK: Mutex<()> = Mutex::new(());

const TABLE: &str = "theme";
const PRIMARY: &str = "primaryColor";
const BACKGROUND: &str = "backgroundColor";

/// Theme file error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file or its directory could not be read or written.
    #[error("Theme file I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file exists but is not TOML.
    #[error("Theme file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    /// The updated document could not be written as TOML.
    #[error("Theme could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// `theme` exists but is not a table.
    #[error("`theme` in the theme file is not a table")]
    NotATable,
}

/// Colors read from the `[theme]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Theme {
    /// `primaryColor`
    pub primary_color: Option<String>,
    /// `backgroundColor`
    pub background_color: Option<String>,
}

impl Theme {
    fn from_table(table: &Table) -> Self {
        let get = |key: &str| {
            table.get(key).and_then(Value::as_str).map(str::to_string)
        };
        Self {
            primary_color: get(PRIMARY),
            background_color: get(BACKGROUND),
        }
    }

    fn write_to(&self, table: &mut Table) {
        if let Some(color) = &self.primary_color {
            table.insert(PRIMARY.into(), Value::String(color.clone()));
        }
        if let Some(color) = &self.background_color {
            table.insert(BACKGROUND.into(), Value::String(color.clone()));
        }
    }
}

/// Handle on a theme config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeFile {
    path: PathBuf,
}

impl ThemeFile {
    /// Where the file lives unless configured otherwise.
    pub const DEFAULT_PATH: &'static str = ".streamlit/config.toml";

    /// Theme file at `path`. Nothing is read until it is used.
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { path: path.into() }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole file as a table. A missing file is an empty table.
    fn load(&self) -> Result<Table, Error> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(text.parse::<Table>()?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Table::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file with `table` through a temporary file in the same
    /// directory.
    fn store(&self, table: &Table) -> Result<(), Error> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(toml::to_string(table)?.as_bytes())?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Read the current theme. A missing file or table gives the default.
    pub fn read(&self) -> Result<Theme, Error> {
        let table = self.load()?;
        match table.get(TABLE) {
            None => Ok(Theme::default()),
            Some(Value::Table(theme)) => Ok(Theme::from_table(theme)),
            Some(_) => Err(Error::NotATable),
        }
    }

    /// Scoped read-modify-write of the theme. Returns the theme as written.
    pub fn update<F>(&self, f: F) -> Result<Theme, Error>
    where
        F: FnOnce(&mut Theme),
    {
        // A panic elsewhere doesn't leave the file half written, so a
        // poisoned lock is still usable.
        let _guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let mut table = self.load()?;
        if !table.contains_key(TABLE) {
            table.insert(TABLE.into(), Value::Table(Table::new()));
        }
        let section = table
            .get_mut(TABLE)
            .and_then(Value::as_table_mut)
            .ok_or(Error::NotATable)?;

        let mut theme = Theme::from_table(section);
        f(&mut theme);
        theme.write_to(section);

        self.store(&table)?;

        #[cfg(feature = "log")]
        log::info!("Theme written to {}", self.path.display());

        Ok(theme)
    }

    /// Set both colors.
    pub fn set_colors(
        &self,
        primary: &str,
        background: &str,
    ) -> Result<Theme, Error> {
        self.update(|theme| {
            theme.primary_color = Some(primary.to_string());
            theme.background_color = Some(background.to_string());
        })
    }
}

impl Default for ThemeFile {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = ThemeFile::new(dir.path().join("config.toml"));
        assert_eq!(file.read().unwrap(), Theme::default());
    }

    #[test]
    fn test_set_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = ThemeFile::new(dir.path().join(".streamlit/config.toml"));

        let written = file.set_colors("#4A90E2", "#4A90E2").unwrap();
        let read = file.read().unwrap();
        assert_eq!(written, read);
        assert_eq!(read.primary_color.as_deref(), Some("#4A90E2"));
        assert_eq!(read.background_color.as_deref(), Some("#4A90E2"));
    }

    #[test]
    fn test_update_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 8501\n\n[theme]\nbase = \"dark\"\nprimaryColor = \"#000000\"\n",
        )
        .unwrap();

        let file = ThemeFile::new(&path);
        file.set_colors("#FF0000", "#00FF00").unwrap();

        let table: Table =
            std::fs::read_to_string(&path).unwrap().parse().unwrap();
        assert_eq!(table["server"]["port"].as_integer(), Some(8501));
        assert_eq!(table["theme"]["base"].as_str(), Some("dark"));
        assert_eq!(table["theme"]["primaryColor"].as_str(), Some("#FF0000"));
        assert_eq!(
            table["theme"]["backgroundColor"].as_str(),
            Some("#00FF00")
        );
    }

    #[test]
    fn test_not_a_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "theme = \"dark\"\n").unwrap();

        let file = ThemeFile::new(&path);
        assert!(matches!(file.read(), Err(Error::NotATable)));
        assert!(matches!(
            file.set_colors("#000000", "#000000"),
            Err(Error::NotATable)
        ));
        // Untouched.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "theme = \"dark\"\n");
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[theme\n").unwrap();
        assert!(matches!(
            ThemeFile::new(&path).read(),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_concurrent_updates() {
        let dir = tempfile::tempdir().unwrap();
        let file = ThemeFile::new(dir.path().join("config.toml"));
        std::fs::write(file.path(), "[theme]\ncount = 0\n").unwrap();

        std::thread::scope(|s| {
            for i in 0..8 {
                let file = &file;
                s.spawn(move || {
                    file.set_colors(&format!("#00000{i}"), "#FFFFFF").unwrap();
                });
            }
        });

        let theme = file.read().unwrap();
        assert!(theme.primary_color.unwrap().starts_with("#00000"));
        assert_eq!(theme.background_color.as_deref(), Some("#FFFFFF"));
        // The untouched key survived every rewrite.
        let table: Table = std::fs::read_to_string(file.path())
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(table["theme"]["count"].as_integer(), Some(0));
    }
}
