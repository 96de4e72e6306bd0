use std::io::{self, Read};

use tar::Archive as Tarball;

use crate::archive::{Archive, ArchiveBuilder, ParsedEntry};
use crate::classify::{EntryCategory, classify};
use crate::config::ResolvedConfig;
use crate::domain::DatasetId;
use crate::error::EgaError;
use crate::fetch::{ArchiveFetcher, HttpTransport, Transport};
use crate::io_util::{CountingReader, format_count};
use crate::mapping::{MappingOptions, parse_mapping};
use crate::markup::parse_markup;

/// Reads a remote EGA metadata tarball into an [`Archive`].
pub struct ArchiveReader<T: Transport> {
    fetcher: ArchiveFetcher<T>,
    mapping: MappingOptions,
}

impl ArchiveReader<HttpTransport> {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, EgaError> {
        let transport = HttpTransport::new(config.timeout)?;
        let fetcher = ArchiveFetcher::new(transport, config.api_url.clone(), config.retry);
        Ok(Self::new(fetcher, config.mapping.clone()))
    }
}

impl<T: Transport> ArchiveReader<T> {
    pub fn new(fetcher: ArchiveFetcher<T>, mapping: MappingOptions) -> Self {
        Self { fetcher, mapping }
    }

    pub fn fetcher(&self) -> &ArchiveFetcher<T> {
        &self.fetcher
    }

    /// Fetches and parses the whole archive. Any entry that fails to parse
    /// fails the read; nothing partial is returned.
    pub fn read(&self, dataset_id: &DatasetId) -> Result<Archive, EgaError> {
        tracing::info!(dataset = %dataset_id, api = self.fetcher.api_url(), "reading metadata archive");
        let fetched = self.fetcher.fetch(dataset_id)?;
        let archive = self.read_tarball(dataset_id, &fetched.url, fetched.body)?;

        let summary = archive.summary();
        tracing::info!(
            dataset = %dataset_id,
            studies = summary.studies,
            samples = summary.samples,
            experiments = summary.experiments,
            runs = summary.runs,
            analyses = summary.analyses,
            mappings = summary.mappings,
            "finished reading metadata archive"
        );
        Ok(archive)
    }

    /// Walks an already decompressed tar stream entry by entry.
    pub fn read_tarball<R: Read>(
        &self,
        dataset_id: &DatasetId,
        url: &str,
        input: R,
    ) -> Result<Archive, EgaError> {
        let input = CountingReader::new(input);
        let counter = input.counter();
        let mut tarball = Tarball::new(input);
        let mut builder = ArchiveBuilder::new(dataset_id.clone());

        let archive_error = |err: io::Error| EgaError::ArchiveRead {
            url: url.to_string(),
            bytes_read: format_count(counter.get()),
            message: err.to_string(),
        };

        for entry in tarball.entries().map_err(archive_error)? {
            let mut entry = entry.map_err(archive_error)?;
            let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let is_file = entry.header().entry_type().is_file();

            let parsed = self
                .read_entry(&path, is_file, &mut entry)
                .map_err(|source| EgaError::EntryProcessing {
                    entry: path.clone(),
                    url: url.to_string(),
                    bytes_read: format_count(counter.get()),
                    source: Box::new(source),
                })?;
            if let Some(parsed) = parsed {
                builder.accept(parsed);
            }
        }

        // Drain past the end-of-archive blocks so the gzip trailer is verified.
        io::copy(&mut tarball.into_inner(), &mut io::sink()).map_err(archive_error)?;

        Ok(builder.build())
    }

    fn read_entry<R: Read>(
        &self,
        path: &str,
        is_file: bool,
        entry: &mut R,
    ) -> Result<Option<ParsedEntry>, EgaError> {
        let Some(classified) = classify(path, is_file) else {
            tracing::trace!(entry = path, "skipping entry");
            return Ok(None);
        };

        let parsed = match classified.category {
            EntryCategory::Mapping => {
                let rows = parse_mapping(&classified.id, entry, &self.mapping)?;
                tracing::debug!(entry = path, id = %classified.id, rows = rows.len(), "parsed mapping");
                ParsedEntry::Mapping {
                    id: classified.id,
                    rows,
                }
            }
            EntryCategory::Descriptor(kind) => {
                let tree = parse_markup(entry)?;
                tracing::debug!(entry = path, id = %classified.id, kind = %kind, "parsed descriptor");
                ParsedEntry::Descriptor {
                    kind,
                    id: classified.id,
                    tree,
                }
            }
        };
        Ok(Some(parsed))
    }
}
