//! 原子文件写入
//!
//! 先写同目录下的临时文件并落盘，再重命名覆盖目标文件，
//! 进程在写入中途被中断时目标文件保持旧内容，不会出现截断的快照。

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// 原子写入文件内容
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path_for(path)?;
    let written = write_and_sync(&tmp_path, contents);
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        AppError::from(e)
    })
}

fn write_and_sync(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

/// 同目录下的临时文件路径：`.{文件名}.tmp`
fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::Validation(format!("路径缺少文件名: {}", path.display())))?;

    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");

    Ok(path.with_file_name(tmp_name))
}
