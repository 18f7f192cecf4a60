use std::path::{Path, PathBuf};

use crate::config::ArtifactNaming;

/// Output files a script is told to write for one call.
///
/// Both files are removed when the set is dropped, so every exit path of a
/// parse (including a cancelled future) leaves the working directory clean.
#[derive(Debug)]
pub struct ArtifactSet {
    output: PathBuf,
    aux: Option<PathBuf>,
}

impl ArtifactSet {
    /// `working_dir` must already end with a path separator.
    pub fn new(
        working_dir: &str,
        output_file: &str,
        aux_file: Option<&str>,
        naming: ArtifactNaming,
    ) -> Self {
        // One call id for both files so they can be matched up on disk.
        let prefix = call_id();
        let name = |file: &str| match naming {
            ArtifactNaming::Fixed => file.to_string(),
            ArtifactNaming::PerInvocation => format!("{prefix}-{file}"),
        };
        Self {
            output: PathBuf::from(format!("{working_dir}{}", name(output_file))),
            aux: aux_file.map(|f| PathBuf::from(format!("{working_dir}{}", name(f)))),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn aux_path(&self) -> Option<&Path> {
        self.aux.as_deref()
    }

    /// Trailing script arguments: output path, then aux path if any.
    pub fn args(&self) -> Vec<&Path> {
        std::iter::once(self.output.as_path())
            .chain(self.aux.as_deref())
            .collect()
    }

    /// Delete whichever artifacts exist. Safe to call more than once.
    pub fn remove_all(&self) {
        for path in std::iter::once(&self.output).chain(self.aux.as_ref()) {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), "failed to remove artifact: {e}")
                }
            }
        }
    }
}

impl Drop for ArtifactSet {
    fn drop(&mut self) {
        self.remove_all();
    }
}

fn call_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_naming_uses_bare_file_names() {
        let set = ArtifactSet::new(
            "/work/",
            "nwchem-output.json",
            Some("nwchem-molecule.png"),
            ArtifactNaming::Fixed,
        );
        assert_eq!(set.output_path(), Path::new("/work/nwchem-output.json"));
        assert_eq!(set.aux_path(), Some(Path::new("/work/nwchem-molecule.png")));
        assert_eq!(set.args().len(), 2);
    }

    #[test]
    fn per_invocation_naming_shares_one_prefix_per_call() {
        let a = ArtifactSet::new("/w/", "out.json", Some("img.png"), ArtifactNaming::PerInvocation);
        let b = ArtifactSet::new("/w/", "out.json", Some("img.png"), ArtifactNaming::PerInvocation);

        let out = a.output_path().file_name().unwrap().to_str().unwrap();
        let img = a.aux_path().unwrap().file_name().unwrap().to_str().unwrap();
        let prefix = out.strip_suffix("-out.json").unwrap();
        assert_eq!(img, format!("{prefix}-img.png"));
        assert_ne!(a.output_path(), b.output_path());
        assert!(a.output_path().starts_with("/w/"));
    }

    #[test]
    fn no_aux_means_single_argument() {
        let set = ArtifactSet::new("/w/", "gamess-output.json", None, ArtifactNaming::Fixed);
        assert_eq!(set.args(), vec![Path::new("/w/gamess-output.json")]);
        assert!(set.aux_path().is_none());
    }

    #[test]
    fn drop_removes_existing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let wd = format!("{}/", dir.path().display());
        let set = ArtifactSet::new(&wd, "out.json", Some("img.png"), ArtifactNaming::Fixed);
        std::fs::write(set.output_path(), "{}").unwrap();
        // aux never written: removal must not complain
        let out = set.output_path().to_path_buf();
        drop(set);
        assert!(!out.exists());
    }
}
