//! Adapter for the external document-conversion engine.
//!
//! The engine turns an input document into `<stem>.md` plus a
//! `<stem>_artifacts/` folder of extracted pictures. It is never
//! reimplemented here, only invoked.

use crate::config::{ConversionOptions, ConverterConfig, DocumentPaths, PageRange};
use crate::error::{CleanupError, Result};
use crate::report::Reporter;
use std::fs;
use std::path::Path;
use std::process::Command;

pub trait Converter {
    fn convert(
        &self,
        input: &Path,
        output_dir: &Path,
        pages: PageRange,
        options: &ConversionOptions,
    ) -> Result<DocumentPaths>;
}

/// Runs a configured external program.
pub struct CommandConverter<'a> {
    config: ConverterConfig,
    reporter: &'a dyn Reporter,
}

impl<'a> CommandConverter<'a> {
    pub fn new(config: ConverterConfig, reporter: &'a dyn Reporter) -> Self {
        Self { config, reporter }
    }

    fn expand_args(
        &self,
        input: &Path,
        output_dir: &Path,
        pages: PageRange,
        options: &ConversionOptions,
    ) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output_dir.to_string_lossy();
        let start = pages.start.to_string();
        let end = pages.end.map(|e| e.to_string()).unwrap_or_default();
        let scale = options.images_scale.to_string();
        let page_images = options.generate_page_images.to_string();
        let picture_images = options.generate_picture_images.to_string();
        let describe = options.do_picture_description.to_string();

        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{start}", &start)
                    .replace("{end}", &end)
                    .replace("{scale}", &scale)
                    .replace("{page_images}", &page_images)
                    .replace("{picture_images}", &picture_images)
                    .replace("{describe}", &describe)
            })
            .filter(|arg| !arg.is_empty())
            .collect()
    }

    /// Refuse a page range the template cannot pass on, and warn about
    /// non-default options it will drop.
    fn check_template(&self, pages: PageRange, options: &ConversionOptions) -> Result<()> {
        let start_lost = pages.start != 1 && !self.config.carries("{start}");
        let end_lost = pages.end.is_some() && !self.config.carries("{end}");
        if start_lost || end_lost {
            return Err(CleanupError::Conversion {
                message: format!(
                    "page range {}-{} cannot be passed to {}: add {{start}}/{{end}} to converter.args",
                    pages.start,
                    pages.end.map(|e| e.to_string()).unwrap_or_default(),
                    self.config.program
                ),
            });
        }

        let defaults = ConversionOptions::default();
        let dropped = [
            ("images_scale", "{scale}", options.images_scale != defaults.images_scale),
            (
                "generate_page_images",
                "{page_images}",
                options.generate_page_images != defaults.generate_page_images,
            ),
            (
                "generate_picture_images",
                "{picture_images}",
                options.generate_picture_images != defaults.generate_picture_images,
            ),
            (
                "do_picture_description",
                "{describe}",
                options.do_picture_description != defaults.do_picture_description,
            ),
        ];
        for (name, placeholder, changed) in dropped {
            if changed && !self.config.carries(placeholder) {
                self.reporter.warn(&format!(
                    "conversion.{name} is ignored: converter.args has no {placeholder}"
                ));
            }
        }
        Ok(())
    }
}

impl Converter for CommandConverter<'_> {
    fn convert(
        &self,
        input: &Path,
        output_dir: &Path,
        pages: PageRange,
        options: &ConversionOptions,
    ) -> Result<DocumentPaths> {
        if !input.exists() {
            return Err(CleanupError::NotFound {
                path: input.to_path_buf(),
            });
        }
        self.check_template(pages, options)?;
        fs::create_dir_all(output_dir).map_err(|e| CleanupError::io(output_dir, e))?;

        let paths = DocumentPaths::for_input(output_dir, input).ok_or_else(|| {
            CleanupError::Conversion {
                message: format!("cannot derive a document name from {}", input.display()),
            }
        })?;

        let args = self.expand_args(input, output_dir, pages, options);
        self.reporter.info(&format!(
            "Converting {} with `{} {}`",
            input.display(),
            self.config.program,
            args.join(" ")
        ));

        let status = Command::new(&self.config.program)
            .args(&args)
            .status()
            .map_err(|e| CleanupError::Conversion {
                message: format!("failed to start {}: {}", self.config.program, e),
            })?;

        if !status.success() {
            return Err(CleanupError::Conversion {
                message: format!("{} exited with {}", self.config.program, status),
            });
        }
        if !paths.document.is_file() {
            return Err(CleanupError::NotFound {
                path: paths.document,
            });
        }

        Ok(paths)
    }
}
