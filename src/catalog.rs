use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Lines, Write},
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    kmer_model::KmerModel,
};

/// Lazily lists the model files named in a catalog, one path per line.
///
/// A blank line ends the catalog.
pub struct ModelCatalog<Reader> {
    lines: Lines<Reader>,
    finished: bool,
}

impl ModelCatalog<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<Reader: BufRead> ModelCatalog<Reader> {
    pub fn new(reader: Reader) -> Self {
        Self {
            lines: reader.lines(),
            finished: false,
        }
    }
}

impl<Reader: BufRead> Iterator for ModelCatalog<Reader> {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.lines.next()? {
            Ok(line) => {
                let line = line.trim_end();
                if line.is_empty() {
                    self.finished = true;
                    None
                } else {
                    Some(Ok(PathBuf::from(line)))
                }
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error.into()))
            }
        }
    }
}

/// Reads a catalog model, attaching its path to any error.
pub fn load_model(path: &Path) -> Result<KmerModel> {
    KmerModel::read_file(path).map_err(|source| Error::ModelLoad {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

pub fn write_catalog(path: impl AsRef<Path>, models: &[PathBuf]) -> Result<()> {
    let mut output = BufWriter::new(File::create(path)?);
    for model in models {
        writeln!(output, "{}", model.display())?;
    }
    output.flush()?;
    Ok(())
}
