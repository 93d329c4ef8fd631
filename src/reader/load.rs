use std::collections::HashMap;
use std::convert::TryInto;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{FilterFunc, LoadOptions, PdfMetadata, Reader};
use crate::{Document, Error, Result};

impl Document {
    /// `open`: load a PDF from any `Read` source under the given
    /// [`LoadOptions`]. This is the canonical entry point; the `load*`/`load_mem*`
    /// convenience methods below are thin wrappers kept for ergonomics and existing
    /// call sites.
    pub fn open<R: Read>(mut source: R, options: LoadOptions) -> Result<Document> {
        let mut buffer = Vec::new();
        source.read_to_end(&mut buffer)?;
        Self::open_mem(&buffer, options)
    }

    pub fn open_mem(buffer: &[u8], options: LoadOptions) -> Result<Document> {
        let decode_all_streams = options.decode_all_streams;
        let mut document = Reader {
            buffer,
            document: Document::new(),
            encryption_state: None,
            password: options.password,
            raw_objects: HashMap::new(),
        }
        .read(options.filter_func)?;

        if decode_all_streams {
            document.decode_all_streams_eagerly();
        }

        Ok(document)
    }

    /// Load a PDF document from a specified file path.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Document> {
        Self::open(File::open(path)?, LoadOptions::default())
    }

    /// Load a PDF document from a specified file path with a password for encrypted PDFs.
    #[inline]
    pub fn load_with_password<P: AsRef<Path>>(path: P, password: &str) -> Result<Document> {
        Self::open(File::open(path)?, LoadOptions::with_password(password))
    }

    #[inline]
    pub fn load_filtered<P: AsRef<Path>>(path: P, filter_func: FilterFunc) -> Result<Document> {
        let mut options = LoadOptions::default();
        options.filter_func = Some(filter_func);
        Self::open(File::open(path)?, options)
    }

    /// Load a PDF document from an arbitrary source.
    #[inline]
    pub fn load_from<R: Read>(source: R) -> Result<Document> {
        Self::open(source, LoadOptions::default())
    }

    /// Load a PDF document from an arbitrary source with a password for encrypted PDFs.
    #[inline]
    pub fn load_from_with_password<R: Read>(source: R, password: &str) -> Result<Document> {
        Self::open(source, LoadOptions::with_password(password))
    }

    /// Load a PDF document from a memory slice.
    pub fn load_mem(buffer: &[u8]) -> Result<Document> {
        buffer.try_into()
    }

    /// Load a PDF document from a memory slice with a password for encrypted PDFs.
    pub fn load_mem_with_password(buffer: &[u8], password: &str) -> Result<Document> {
        Self::open_mem(buffer, LoadOptions::with_password(password))
    }

    /// Load PDF metadata (title and page count) without loading the entire document.
    /// This is much faster for large PDFs when you only need basic information.
    #[inline]
    pub fn load_metadata<P: AsRef<Path>>(path: P) -> Result<PdfMetadata> {
        Self::load_metadata_internal(File::open(path)?, None)
    }

    /// Load PDF metadata from a file path with a password for encrypted PDFs.
    #[inline]
    pub fn load_metadata_with_password<P: AsRef<Path>>(path: P, password: &str) -> Result<PdfMetadata> {
        Self::load_metadata_internal(File::open(path)?, Some(password.to_string()))
    }

    /// Load PDF metadata from an arbitrary source without loading the entire document.
    #[inline]
    pub fn load_metadata_from<R: Read>(source: R) -> Result<PdfMetadata> {
        Self::load_metadata_internal(source, None)
    }

    /// Load PDF metadata from an arbitrary source with a password for encrypted PDFs.
    #[inline]
    pub fn load_metadata_from_with_password<R: Read>(source: R, password: &str) -> Result<PdfMetadata> {
        Self::load_metadata_internal(source, Some(password.to_string()))
    }

    /// Load PDF metadata from a memory slice without loading the entire document.
    #[inline]
    pub fn load_metadata_mem(buffer: &[u8]) -> Result<PdfMetadata> {
        Reader {
            buffer,
            document: Document::new(),
            encryption_state: None,
            password: None,
            raw_objects: HashMap::new(),
        }
        .read_metadata()
    }

    /// Load PDF metadata from a memory slice with a password for encrypted PDFs.
    #[inline]
    pub fn load_metadata_mem_with_password(buffer: &[u8], password: &str) -> Result<PdfMetadata> {
        Reader {
            buffer,
            document: Document::new(),
            encryption_state: None,
            password: Some(password.to_string()),
            raw_objects: HashMap::new(),
        }
        .read_metadata()
    }

    fn load_metadata_internal<R: Read>(mut source: R, password: Option<String>) -> Result<PdfMetadata> {
        let mut buffer = Vec::new();
        source.read_to_end(&mut buffer)?;

        Reader {
            buffer: &buffer,
            document: Document::new(),
            encryption_state: None,
            password,
            raw_objects: HashMap::new(),
        }
        .read_metadata()
    }
}

impl TryInto<Document> for &[u8] {
    type Error = Error;

    fn try_into(self) -> Result<Document> {
        Document::open_mem(self, LoadOptions::default())
    }
}
