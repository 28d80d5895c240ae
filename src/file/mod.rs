//! Loading and saving module images.
//!
//! A module image is the JSON encoding of a [`Module`] graph, conventionally stored with the
//! `.dwm` extension. Images are read through a read-only memory map and written atomically:
//! the new image goes to a temporary file next to the destination which is then persisted
//! over it, so a failed write never leaves a truncated image behind.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotweave::Module;
//! use std::path::Path;
//!
//! let module = Module::from_file(Path::new("Contracts.dwm"))?;
//! module.write_to_file(Path::new("Contracts.woven.dwm"))?;
//! # Ok::<(), dotweave::Error>(())
//! ```

mod output;

use std::{fs, path::Path};

use memmap2::Mmap;

use crate::{metadata::module::Module, metadata::token::Token, Error, Result};

/// File extension of module images
pub const IMAGE_EXTENSION: &str = "dwm";

impl Module {
    /// Load a module image from disk.
    ///
    /// # Arguments
    /// * `path` - Path of the image to load
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] if the file cannot be opened or mapped,
    /// [`Error::Serialization`] if it is not a module image and [`Error::Malformed`]
    /// if the decoded graph is inconsistent.
    pub fn from_file(path: &Path) -> Result<Module> {
        let file = fs::File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(malformed_error!("{} is empty", path.display()));
        }

        // Safety: the map is read-only and dropped before this function returns
        let data = unsafe { Mmap::map(&file) }?;
        Module::from_mem(&data)
    }

    /// Decode a module image from memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if `data` is not a module image and
    /// [`Error::Malformed`] if the decoded graph is inconsistent.
    pub fn from_mem(data: &[u8]) -> Result<Module> {
        let module: Module = serde_json::from_slice(data)?;
        module.validate()?;
        Ok(module)
    }

    /// Encode this module into an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Atomically write this module image to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] or [`Error::Serialization`]. On error the file at `path`,
    /// if any, is left untouched.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let data = self.to_bytes()?;
        output::write_atomic(path, &data)
    }

    /// Check that every token stored in the graph points to a row of the right table and
    /// that each row sits at the position its own token claims.
    fn validate(&self) -> Result<()> {
        fn check_row(kind: &str, index: usize, token: Token, table: u8) -> Result<()> {
            if token.table() != table || token.index() != Some(index) {
                return Err(malformed_error!(
                    "{} row {} carries token {}",
                    kind,
                    index + 1,
                    token
                ));
            }
            Ok(())
        }

        for (index, ty) in self.types.iter().enumerate() {
            check_row("type", index, ty.token, Token::TYPE_DEF)?;
            if let Some(outer) = ty.declaring_type {
                self.type_def(outer)?;
            }
            for &field in &ty.fields {
                self.field(field)?;
            }
            for &method in &ty.methods {
                self.method(method)?;
            }
            for &property in &ty.properties {
                self.property(property)?;
            }
        }
        for (index, field) in self.fields.iter().enumerate() {
            check_row("field", index, field.token, Token::FIELD)?;
            self.type_def(field.declaring_type)?;
        }
        for (index, method) in self.methods.iter().enumerate() {
            check_row("method", index, method.token, Token::METHOD_DEF)?;
            self.type_def(method.declaring_type)?;
        }
        for (index, property) in self.properties.iter().enumerate() {
            check_row("property", index, property.token, Token::PROPERTY)?;
            self.type_def(property.declaring_type)?;
            for accessor in [property.getter, property.setter].into_iter().flatten() {
                self.method(accessor)?;
            }
        }
        Ok(())
    }
}
