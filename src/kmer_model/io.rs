//! Binary model files.
//!
//! Layout, all integers little endian:
//! a `u32` k-mer length, then nine strings (model name followed by the eight taxonomic ranks
//! from kingdom to strain), each a `u64` byte length followed by UTF-8 bytes,
//! then `4^k` `f32` log probabilities in ascending code order.

use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Read, Write},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{KmerModel, ProbabilityTable};
use crate::{
    error::{Error, Result},
    kmer_encoder::KmerEncoder,
    taxonomy::Taxonomy,
};

const MAX_STRING_LENGTH: u64 = 1 << 16;
const TABLE_CHUNK_LENGTH: usize = 1 << 16;

impl KmerModel {
    /// Writes a finalised model.
    pub fn write(&self, mut writer: impl Write) -> Result<()> {
        let log_probabilities = self.log_probabilities().ok_or(Error::ModelNotFinalized)?;

        writer.write_u32::<LittleEndian>(self.word_length() as u32)?;
        write_string(&mut writer, &self.name)?;
        for rank in self.taxonomy.ranks() {
            write_string(&mut writer, rank)?;
        }
        for &log_probability in log_probabilities {
            writer.write_f32::<LittleEndian>(log_probability)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Reads a finalised model.
    ///
    /// The k-mer and sequence counts of the training run are not stored and read back as zero.
    pub fn read(mut reader: impl Read) -> Result<Self> {
        let word_length = reader
            .read_u32::<LittleEndian>()
            .map_err(|error| truncated(error, "k-mer length"))?;
        let encoder = KmerEncoder::new(word_length as usize).map_err(|_| {
            Error::CorruptModel(format!("unsupported k-mer length {word_length}"))
        })?;

        let name = read_string(&mut reader, "model name")?;
        let mut ranks: [String; crate::taxonomy::RANK_COUNT] = Default::default();
        for rank in &mut ranks {
            *rank = read_string(&mut reader, "taxonomy")?;
        }

        // The table grows only as far as the file actually reaches.
        let kmer_count = encoder.kmer_count();
        let mut log_probabilities = Vec::new();
        let mut chunk = vec![0.0; kmer_count.min(TABLE_CHUNK_LENGTH)];
        while log_probabilities.len() < kmer_count {
            let remaining = kmer_count - log_probabilities.len();
            let chunk = &mut chunk[..remaining.min(TABLE_CHUNK_LENGTH)];
            reader
                .read_f32_into::<LittleEndian>(chunk)
                .map_err(|error| truncated(error, "log probabilities"))?;
            log_probabilities.extend_from_slice(chunk);
        }
        if let Some(code) = log_probabilities
            .iter()
            .position(|log_probability| !(log_probability.is_finite() && *log_probability <= 0.0))
        {
            return Err(Error::CorruptModel(format!(
                "k-mer {code} has log probability {}",
                log_probabilities[code]
            )));
        }

        let mut trailing = [0u8; 1];
        if reader.read(&mut trailing)? != 0 {
            return Err(Error::CorruptModel(
                "trailing data after log probabilities".to_string(),
            ));
        }

        Ok(Self {
            name,
            taxonomy: Taxonomy::new(ranks),
            encoder,
            valid_kmers: 0,
            sequences: 0,
            table: ProbabilityTable::LogProbabilities(log_probabilities),
        })
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write(BufWriter::new(File::create(path)?))
    }

    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?))
    }
}

fn write_string(writer: &mut impl Write, string: &str) -> Result<()> {
    writer.write_u64::<LittleEndian>(string.len() as u64)?;
    writer.write_all(string.as_bytes())?;
    Ok(())
}

fn read_string(reader: &mut impl Read, field: &str) -> Result<String> {
    let length = reader
        .read_u64::<LittleEndian>()
        .map_err(|error| truncated(error, field))?;
    if length > MAX_STRING_LENGTH {
        return Err(Error::CorruptModel(format!(
            "{field} has implausible length {length}"
        )));
    }

    let mut bytes = vec![0; length as usize];
    reader
        .read_exact(&mut bytes)
        .map_err(|error| truncated(error, field))?;
    String::from_utf8(bytes)
        .map_err(|_| Error::CorruptModel(format!("{field} is not valid UTF-8")))
}

fn truncated(error: std::io::Error, field: &str) -> Error {
    if error.kind() == ErrorKind::UnexpectedEof {
        Error::CorruptModel(format!("file ends while reading {field}"))
    } else {
        Error::IO(error)
    }
}
