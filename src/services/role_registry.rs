//! 角色注册表
//!
//! 启动时从角色目录加载全部角色描述文件，之后只读。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::role::Role;
use crate::storage::atomic::write_atomic;

/// 角色注册表
///
/// 加载顺序按文件名排序，该顺序同时决定触发词匹配时角色之间的优先级。
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: Vec<Role>,
    default_prompt: String,
}

impl RoleRegistry {
    /// 由给定角色列表创建注册表
    pub fn new(roles: Vec<Role>, default_prompt: &str) -> Self {
        Self {
            roles,
            default_prompt: default_prompt.to_string(),
        }
    }

    /// 从目录加载全部 `*.json` 角色描述文件
    ///
    /// 单个文件读取或解析失败只记录日志并跳过；目录不存在时得到空注册表。
    pub fn load_from_dir(dir: &Path, default_prompt: &str) -> Self {
        let mut files = match descriptor_files(dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("无法读取角色目录 {}: {}", dir.display(), e);
                Vec::new()
            }
        };
        files.sort();

        let mut roles = Vec::with_capacity(files.len());
        for path in files {
            match load_descriptor(&path) {
                Ok(role) => {
                    tracing::info!("已加载角色配置: {}", role.name);
                    roles.push(role);
                }
                Err(e) => {
                    tracing::warn!("角色配置文件 {} 无效，已跳过: {}", path.display(), e);
                }
            }
        }

        Self::new(roles, default_prompt)
    }

    /// 全部角色，按加载顺序
    pub fn all_roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// 按主名称精确查找角色
    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|role| role.name == name)
    }

    /// 查找被 `name_or_alias` 提及的第一个角色（名称或任一别名被包含）
    pub fn find(&self, name_or_alias: &str) -> Option<&Role> {
        self.roles
            .iter()
            .find(|role| role.is_mentioned_by(name_or_alias))
    }

    /// 角色的系统提示词，按加载顺序取第一个被提及的角色，没有匹配时返回默认提示词
    pub fn prompt_for(&self, name_or_alias: &str) -> &str {
        self.find(name_or_alias)
            .map(|role| role.system_prompt.as_str())
            .unwrap_or(&self.default_prompt)
    }
}

fn descriptor_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(files)
}

fn load_descriptor(path: &Path) -> Result<Role> {
    let content = fs::read_to_string(path)?;
    let role: Role = serde_json::from_str(&content)?;
    if role.name.trim().is_empty() {
        return Err(AppError::Validation("角色名称不能为空".to_string()));
    }
    Ok(role)
}

/// 由角色名称生成描述文件名：去掉 `@`，空格替换为下划线，转小写
pub fn descriptor_file_name(name: &str) -> String {
    let stem = name.replace('@', "").replace(' ', "_").to_lowercase();
    if stem.ends_with(".json") {
        stem
    } else {
        format!("{}.json", stem)
    }
}

/// 写入新的角色描述文件，返回文件路径
///
/// 文件已存在且 `overwrite` 为 false 时返回错误。
pub fn write_descriptor(dir: &Path, role: &Role, overwrite: bool) -> Result<PathBuf> {
    if role.name.trim().is_empty() {
        return Err(AppError::Validation("角色名称不能为空".to_string()));
    }
    if role.system_prompt.trim().is_empty() {
        return Err(AppError::Validation("系统提示词不能为空".to_string()));
    }

    let path = dir.join(descriptor_file_name(&role.name));
    if path.exists() && !overwrite {
        return Err(AppError::Validation(format!(
            "角色配置文件已存在: {}",
            path.display()
        )));
    }

    let json = serde_json::to_string_pretty(role)?;
    write_atomic(&path, json.as_bytes())?;
    Ok(path)
}

/// 查找主名称为 `name` 的描述文件，返回路径和角色
///
/// 无法解析的文件被忽略；没有匹配时返回 `NotFound`。
pub fn find_descriptor(dir: &Path, name: &str) -> Result<(PathBuf, Role)> {
    let mut files = descriptor_files(dir)?;
    files.sort();
    files
        .into_iter()
        .find_map(|path| match load_descriptor(&path) {
            Ok(role) if role.name == name => Some((path, role)),
            _ => None,
        })
        .ok_or_else(|| AppError::NotFound(format!("角色 {}", name)))
}

/// 角色描述的修改项，`None` 表示保持不变
#[derive(Debug, Clone, Default)]
pub struct DescriptorUpdate {
    pub name: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub system_prompt: Option<String>,
}

/// 修改已有角色，原文件原地覆盖，返回文件路径和修改后的角色
pub fn update_descriptor(dir: &Path, name: &str, update: DescriptorUpdate) -> Result<(PathBuf, Role)> {
    let (path, mut role) = find_descriptor(dir, name)?;

    if let Some(new_name) = update.name {
        if new_name.trim().is_empty() {
            return Err(AppError::Validation("角色名称不能为空".to_string()));
        }
        role.name = new_name;
    }
    if let Some(aliases) = update.aliases {
        role.aliases = aliases;
    }
    if let Some(prompt) = update.system_prompt {
        if prompt.trim().is_empty() {
            return Err(AppError::Validation("系统提示词不能为空".to_string()));
        }
        role.system_prompt = prompt;
    }

    let json = serde_json::to_string_pretty(&role)?;
    write_atomic(&path, json.as_bytes())?;
    Ok((path, role))
}

/// 删除角色描述文件，返回被删除的路径
pub fn delete_descriptor(dir: &Path, name: &str) -> Result<PathBuf> {
    let (path, _) = find_descriptor(dir, name)?;
    fs::remove_file(&path)?;
    Ok(path)
}
