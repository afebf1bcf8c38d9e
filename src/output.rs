use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{InventoryError, InventoryResult};
use crate::models::ResolvedRow;

const HEADER: [&str; 5] = ["Resource", "Type", "Member", "Role", "Permission"];

/// Writes one CSV line per (row, permission).
///
/// A role without permissions still gets one line, with an empty permission.
pub fn write_rows<W: Write>(writer: W, rows: &[ResolvedRow]) -> InventoryResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER).map_err(csv_error)?;

    for resolved in rows {
        let row = &resolved.row;
        let values = resolved.permissions.values();
        let permissions = if values.is_empty() { vec![""] } else { values };

        for permission in permissions {
            csv.write_record([
                row.resource.as_str(),
                row.kind.as_str(),
                row.member.as_str(),
                row.role.as_str(),
                permission,
            ])
            .map_err(csv_error)?;
        }
    }

    csv.flush()
        .map_err(|err| InventoryError::output(format!("error flushing writer: {err}")))
}

/// Outcome of [`export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(PathBuf),
    /// The target already existed and was left untouched.
    Skipped(PathBuf),
}

/// Writes rows to `path` through a `tmp.` sibling renamed into place once
/// complete.
pub fn export(path: &Path, rows: &[ResolvedRow]) -> InventoryResult<ExportOutcome> {
    if path.exists() {
        return Ok(ExportOutcome::Skipped(path.to_path_buf()));
    }

    let tmp = temporary_path(path)?;
    let file = File::create(&tmp)
        .map_err(|err| InventoryError::output(format!("unable to create {}: {err}", tmp.display())))?;

    if let Err(err) = write_rows(file, rows) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    fs::rename(&tmp, path).map_err(|err| {
        InventoryError::output(format!("unable to move {} to {}: {err}", tmp.display(), path.display()))
    })?;

    Ok(ExportOutcome::Written(path.to_path_buf()))
}

/// Checked before collecting so a finished export is not redone.
pub fn is_already_exported(path: &Path) -> bool {
    path.exists()
}

fn temporary_path(path: &Path) -> InventoryResult<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| InventoryError::output(format!("{} is not a file path", path.display())))?;
    Ok(path.with_file_name(format!("tmp.{}", name.to_string_lossy())))
}

fn csv_error(err: csv::Error) -> InventoryError {
    InventoryError::output(format!("unable to write csv: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_file_sits_next_to_target() {
        let tmp = temporary_path(Path::new("out/report.csv")).expect("tmp path");
        assert_eq!(tmp, PathBuf::from("out/tmp.report.csv"));
    }
}
