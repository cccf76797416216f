use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display},
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::error::{Error, Result};

pub const RANK_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaxonomicRank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
    Strain,
}

impl TaxonomicRank {
    pub const ALL: [Self; RANK_COUNT] = [
        Self::Kingdom,
        Self::Phylum,
        Self::Class,
        Self::Order,
        Self::Family,
        Self::Genus,
        Self::Species,
        Self::Strain,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// An 8-rank taxonomic label, from kingdom down to strain.
///
/// The text form is `kingdom;phylum;class;order;family;genus;species;strain;`.
/// Missing trailing ranks are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Taxonomy {
    ranks: [String; RANK_COUNT],
}

impl Taxonomy {
    pub fn new(ranks: [String; RANK_COUNT]) -> Self {
        Self { ranks }
    }

    pub fn rank(&self, rank: TaxonomicRank) -> &str {
        &self.ranks[rank.index()]
    }

    pub fn ranks(&self) -> &[String; RANK_COUNT] {
        &self.ranks
    }

    pub fn strain(&self) -> &str {
        self.rank(TaxonomicRank::Strain)
    }
}

impl FromStr for Taxonomy {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self> {
        let string = string.trim();
        let string = string.strip_suffix(';').unwrap_or(string);
        if string.is_empty() {
            return Ok(Self::default());
        }

        let parts: Vec<_> = string.split(';').map(str::trim).collect();
        if parts.len() > RANK_COUNT {
            return Err(Error::TaxonomyRankCount(parts.len()));
        }

        let mut taxonomy = Self::default();
        for (rank, part) in taxonomy.ranks.iter_mut().zip(parts) {
            *rank = part.to_string();
        }
        Ok(taxonomy)
    }
}

impl Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in &self.ranks {
            write!(f, "{rank};")?;
        }
        Ok(())
    }
}

/// Assigns taxonomies to sequence ids, read from lines `<sequence id>\t<taxonomy>`.
#[derive(Debug, Default)]
pub struct TaxonomyMap {
    taxonomies: HashMap<String, Taxonomy>,
}

impl TaxonomyMap {
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::from_reader(BufReader::new(File::open(path)?), path)
    }

    fn from_reader(reader: impl BufRead, path: &Path) -> Result<Self> {
        let mut taxonomies = HashMap::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let (id, taxonomy) =
                line.split_once('\t')
                    .ok_or_else(|| Error::MalformedTaxonomyLine {
                        path: PathBuf::from(path),
                        line: index + 1,
                    })?;
            taxonomies.insert(id.trim().to_string(), taxonomy.parse()?);
        }

        Ok(Self { taxonomies })
    }

    pub fn get(&self, id: &str) -> Option<&Taxonomy> {
        self.taxonomies.get(id)
    }

    pub fn len(&self) -> usize {
        self.taxonomies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxonomies.is_empty()
    }

    /// The number of distinct non-empty strains.
    pub fn strain_count(&self) -> usize {
        self.taxonomies
            .values()
            .map(Taxonomy::strain)
            .filter(|strain| !strain.is_empty())
            .collect::<HashSet<_>>()
            .len()
    }
}
