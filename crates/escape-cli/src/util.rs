use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use escape_engine::BitBoard;
use serde::{Serialize, de::DeserializeOwned};

use crate::schema::settings::SettingsFile;

/// JSON sink: a file when a path is given, stdout otherwise.
pub struct Output {
    writer: Box<dyn Write>,
    path: Option<PathBuf>,
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        Self::create(output_path)?.write_json(value)
    }

    pub fn create(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let writer: Box<dyn Write> = match &path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(io::stdout().lock()),
        };
        Ok(Self { writer, path })
    }

    fn name(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| "stdout".to_owned(), |path| path.display().to_string())
    }

    pub fn write_json<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        serde_json::to_writer_pretty(&mut self.writer, value)
            .with_context(|| format!("Failed to write JSON to {}", self.name()))?;
        writeln!(self.writer)
            .and_then(|()| self.writer.flush())
            .with_context(|| format!("Failed to finish output to {}", self.name()))
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} JSON file: {}", path.display()))
}

/// Read an AI settings override from a JSON file
pub fn read_settings_file<P>(path: P) -> anyhow::Result<SettingsFile>
where
    P: AsRef<Path>,
{
    read_json_file("settings", path)
}

/// Read a bottom-aligned ASCII board (`#` filled, `.` empty) from a text file
pub fn read_board_file<P>(path: P) -> anyhow::Result<BitBoard>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let art = fs::read_to_string(path)
        .with_context(|| format!("Failed to read board file: {}", path.display()))?;
    BitBoard::parse_ascii(&art)
        .with_context(|| format!("Failed to parse board file: {}", path.display()))
}
