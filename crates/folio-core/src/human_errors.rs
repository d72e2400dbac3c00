// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for dialogs and the status bar.
//
// Every technical error is mapped to a plain sentence plus what to do next.
// Nothing is retried automatically; the severity only drives presentation.

use crate::error::FolioError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user can fix it right away (enter a password, pick a file).
    ActionRequired,
    /// Something went wrong that a second attempt may not change.
    Failure,
    /// The file or request cannot be handled at all.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `FolioError` into a `HumanError`.
pub fn humanize_error(err: &FolioError) -> HumanError {
    match err {
        // -- Source errors --
        FolioError::UnsupportedSource(detail) => HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: format!(
                "Add JPEG, PNG, BMP, TIFF images or PDF documents. ({detail})"
            ),
            severity: Severity::Permanent,
        },

        FolioError::PdfError(_) => HumanError {
            message: "There's a problem with one of the PDF files.".into(),
            suggestion: "The file may be damaged. Try opening it in a PDF viewer first, or remove it from the list.".into(),
            severity: Severity::Permanent,
        },

        FolioError::ImageError(_) => HumanError {
            message: "There's a problem with one of the images.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            severity: Severity::Permanent,
        },

        FolioError::Rasterize(_) | FolioError::RasterizerUnavailable => HumanError {
            message: "A page couldn't be flattened into an image.".into(),
            suggestion: "Turn off \"Flatten pages\" and try again, or check that the PDF renderer library is installed.".into(),
            severity: Severity::Failure,
        },

        FolioError::PasswordRequired { path } => HumanError {
            message: format!("{} is password protected.", display_name(path)),
            suggestion: "Enter the document's password to add it.".into(),
            severity: Severity::ActionRequired,
        },

        FolioError::WrongPassword { path } => HumanError {
            message: format!("That password doesn't open {}.", display_name(path)),
            suggestion: "Check the password and try again.".into(),
            severity: Severity::ActionRequired,
        },

        FolioError::SourceChanged { path, .. } => HumanError {
            message: format!("{} changed after it was added.", display_name(path)),
            suggestion: "Remove the file from the list and add it again.".into(),
            severity: Severity::ActionRequired,
        },

        // -- Output errors --
        FolioError::Encryption(_) => HumanError {
            message: "The PDF couldn't be encrypted.".into(),
            suggestion: "Try a different password, or save without encryption.".into(),
            severity: Severity::Failure,
        },

        // -- Request validation --
        FolioError::EmptyWorklist => HumanError {
            message: "There's nothing to convert yet.".into(),
            suggestion: "Add some images or PDF files first.".into(),
            severity: Severity::ActionRequired,
        },

        FolioError::MissingPassword => HumanError {
            message: "Encryption needs a password.".into(),
            suggestion: "Type a password, or turn encryption off.".into(),
            severity: Severity::ActionRequired,
        },

        FolioError::NoDestination => HumanError {
            message: "No output file was chosen.".into(),
            suggestion: "Choose where to save the PDF.".into(),
            severity: Severity::ActionRequired,
        },

        FolioError::ConversionInProgress => HumanError {
            message: "A conversion is still running.".into(),
            suggestion: "Wait for it to finish before changing the list.".into(),
            severity: Severity::ActionRequired,
        },

        FolioError::InvalidSelection(_) => HumanError {
            message: "That selection can't be used.".into(),
            suggestion: "Select the items again and retry.".into(),
            severity: Severity::ActionRequired,
        },

        // -- Storage --
        FolioError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Remove it from the list and add it again.".into(),
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Folio doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or save to a different folder.".into(),
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                    severity: Severity::Failure,
                }
            }
        }

        FolioError::Serialization(_) => HumanError {
            message: "Folio couldn't read its settings.".into(),
            suggestion: "Your settings were reset to the defaults.".into(),
            severity: Severity::Failure,
        },

        FolioError::Worker(detail) => HumanError {
            message: "A background task stopped unexpectedly.".into(),
            suggestion: format!("Try the conversion again. (Detail: {detail})"),
            severity: Severity::Failure,
        },
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn wrong_password_is_action_required() {
        let err = FolioError::WrongPassword {
            path: PathBuf::from("/tmp/scans/report.pdf"),
        };
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.message.contains("report.pdf"));
        assert!(!human.message.contains("/tmp"));
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = FolioError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn corrupt_pdf_is_permanent() {
        let human = humanize_error(&FolioError::PdfError("bad xref".into()));
        assert_eq!(human.severity, Severity::Permanent);
    }

    #[test]
    fn rasterizer_failures_point_at_flatten() {
        let human = humanize_error(&FolioError::RasterizerUnavailable);
        assert!(human.suggestion.contains("Flatten"));
    }
}
