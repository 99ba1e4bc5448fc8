use crate::error::ValidationError;
use crate::model::{OperationKind, OperationRequest};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::File;
use std::io;

/// Which external tool serves an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineRole {
    Encryption,
    Compression,
}

impl EngineRole {
    pub fn for_kind(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Encrypt | OperationKind::Decrypt => EngineRole::Encryption,
            OperationKind::Compress | OperationKind::Decompress => EngineRole::Compression,
        }
    }
}

/// A fully validated command line, ready to hand to an [`Engine`](super::Engine).
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    pub role: EngineRole,
    pub kind: OperationKind,
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Arguments with the password slot masked, for logging.
    pub fn redacted_args(&self) -> Vec<String> {
        self.args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                if i == 3 && self.kind.requires_password() {
                    "<redacted>".to_string()
                } else {
                    a.to_string_lossy().into_owned()
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("role", &self.role)
            .field("kind", &self.kind)
            .field("args", &self.redacted_args())
            .finish()
    }
}

/// Check a request and build its engine command line.
///
/// Paths and password are checked before touching the filesystem, so an
/// incomplete form never costs a `stat`.
pub fn validate(req: &OperationRequest) -> Result<Invocation, ValidationError> {
    if req.input_path().as_os_str().is_empty() {
        return Err(ValidationError::MissingInput);
    }
    if req.output_path().as_os_str().is_empty() {
        return Err(ValidationError::MissingOutput);
    }

    let kind = req.kind();
    let password = if kind.requires_password() {
        match req.password() {
            Some(p) if !p.is_empty() => Some(p),
            _ => return Err(ValidationError::MissingPassword { kind }),
        }
    } else {
        None
    };

    check_input_readable(req)?;

    let mut args: Vec<OsString> = Vec::with_capacity(4);
    args.push(kind.as_verb().into());
    args.push(req.input_path().as_os_str().to_owned());
    args.push(req.output_path().as_os_str().to_owned());
    if let Some(p) = password {
        args.push(p.into());
    }

    Ok(Invocation {
        role: EngineRole::for_kind(kind),
        kind,
        args,
    })
}

fn check_input_readable(req: &OperationRequest) -> Result<(), ValidationError> {
    let path = req.input_path();
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ValidationError::InputNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ValidationError::InputUnreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if !meta.is_file() {
        return Err(ValidationError::InputNotAFile {
            path: path.to_path_buf(),
        });
    }
    File::open(path).map_err(|source| ValidationError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn input_file() -> tempfile::NamedTempFile {
        let f = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(f.path(), b"plain text").unwrap();
        f
    }

    fn args_of(inv: &Invocation) -> Vec<String> {
        inv.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn encrypt_builds_four_arguments_with_password_last() {
        let input = input_file();
        let req = OperationRequest::new(
            input.path(),
            "out.enc",
            OperationKind::Encrypt,
            Some("s3cret".into()),
        );
        let inv = validate(&req).unwrap();
        assert_eq!(inv.role, EngineRole::Encryption);
        assert_eq!(
            args_of(&inv),
            vec![
                "encrypt".to_string(),
                input.path().to_string_lossy().into_owned(),
                "out.enc".to_string(),
                "s3cret".to_string(),
            ]
        );
    }

    #[test]
    fn compression_ignores_password() {
        let input = input_file();
        let req = OperationRequest::new(
            input.path(),
            "out.huf",
            OperationKind::Compress,
            Some("ignored".into()),
        );
        let inv = validate(&req).unwrap();
        assert_eq!(inv.role, EngineRole::Compression);
        assert_eq!(inv.args.len(), 3);
        assert_eq!(inv.args[0], "compress");
    }

    #[test]
    fn empty_paths_are_rejected_for_every_kind() {
        for kind in OperationKind::ALL {
            let req = OperationRequest::new("", "out", kind, Some("pw".into()));
            assert!(matches!(validate(&req), Err(ValidationError::MissingInput)));

            let req = OperationRequest::new("in", "", kind, Some("pw".into()));
            assert!(matches!(
                validate(&req),
                Err(ValidationError::MissingOutput)
            ));
        }
    }

    #[test]
    fn crypto_kinds_require_non_empty_password() {
        let input = input_file();
        for kind in [OperationKind::Encrypt, OperationKind::Decrypt] {
            for pw in [None, Some(String::new())] {
                let req = OperationRequest::new(input.path(), "out", kind, pw);
                assert!(matches!(
                    validate(&req),
                    Err(ValidationError::MissingPassword { .. })
                ));
            }
        }
    }

    #[test]
    fn missing_input_file_is_reported() {
        let req = OperationRequest::new(
            Path::new("/definitely/not/here.txt"),
            "out",
            OperationKind::Compress,
            None,
        );
        assert!(matches!(
            validate(&req),
            Err(ValidationError::InputNotFound { .. })
        ));
    }

    #[test]
    fn directory_is_not_accepted_as_input() {
        let dir = tempfile::tempdir().unwrap();
        let req = OperationRequest::new(dir.path(), "out", OperationKind::Compress, None);
        assert!(matches!(
            validate(&req),
            Err(ValidationError::InputNotAFile { .. })
        ));
    }

    #[test]
    fn redacted_args_hide_the_password() {
        let input = input_file();
        let req = OperationRequest::new(
            input.path(),
            "out",
            OperationKind::Decrypt,
            Some("topsecret".into()),
        );
        let inv = validate(&req).unwrap();
        let shown = inv.redacted_args();
        assert_eq!(shown[3], "<redacted>");
        assert!(!format!("{inv:?}").contains("topsecret"));
    }
}
