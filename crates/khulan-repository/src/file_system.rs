//! File system content source
//!
//! Layout under the site root:
//!
//! ```text
//! content/site[.lang].yaml                  site content
//! content/<[num_]slug>/<template>[.lang].yaml
//! content/<page>/_drafts/<slug>/...         draft pages
//! content/<page>/<file>                     page files
//! content/<page>/<file>[.lang].yaml         file content
//! accounts/<user-id>/index.yaml             email, name, role
//! accounts/<user-id>/user[.lang].yaml       user content
//! blueprints/{pages,files,users}/<name>.yaml
//! blueprints/site.yaml
//! ```
//!
//! A numeric prefix marks a listed page, no prefix an unlisted one.

use async_trait::async_trait;
use khulan_core::{
    derive_key, Blueprint, EntityKind, FieldMap, KindMeta, Languages, PageStatus, SchemaLookup,
    Value,
};
use path_absolutize::Absolutize;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::SourceConfig;
use crate::traits::{ContentEntity, ContentSource};
use crate::{RepositoryError, RepositoryResult};

const YAML_EXTENSION: &str = ".yaml";
const DRAFTS_DIR: &str = "_drafts";
const DEFAULT_BLUEPRINT: &str = "default";
const DEFAULT_ROLE: &str = "nobody";
const SITE_ID: &str = "site";

/// Paths and languages shared by the source and its entities
#[derive(Debug)]
struct SiteLayout {
    root: PathBuf,
    languages: Languages,
}

impl SiteLayout {
    fn content_dir(&self) -> PathBuf {
        self.root.join("content")
    }

    fn accounts_dir(&self) -> PathBuf {
        self.root.join("accounts")
    }

    fn blueprint_path(&self, section: Option<&str>, name: &str) -> PathBuf {
        let dir = self.root.join("blueprints");
        let dir = match section {
            Some(section) => dir.join(section),
            None => dir,
        };
        dir.join(format!("{}{}", name, YAML_EXTENSION))
    }

    /// Content file of a variant; multilingual sites carry the code in the name
    fn content_file(&self, dir: &Path, stem: &str, language: Option<&str>) -> PathBuf {
        match self.languages.resolve(language) {
            Some(code) if self.languages.is_multilingual() => {
                dir.join(format!("{}.{}{}", stem, code, YAML_EXTENSION))
            }
            _ => dir.join(format!("{}{}", stem, YAML_EXTENSION)),
        }
    }

    /// Split a content file name into its stem, dropping any language code
    fn content_stem(&self, file_name: &str) -> Option<String> {
        let stem = file_name.strip_suffix(YAML_EXTENSION)?;
        let base = self.languages.codes().iter().find_map(|code| {
            stem.strip_suffix(code.as_str())
                .and_then(|rest| rest.strip_suffix('.'))
        });
        Some(base.unwrap_or(stem).to_string())
    }

    /// First blueprint found among `names` in a section
    async fn blueprint(&self, section: Option<&str>, names: &[&str]) -> Option<Blueprint> {
        for name in names {
            let path = self.blueprint_path(section, name);
            match fs::read_to_string(&path).await {
                Ok(source) => match Blueprint::from_yaml(&source) {
                    Ok(blueprint) => return Some(blueprint),
                    Err(e) => {
                        warn!("Ignoring invalid blueprint {}: {}", path.display(), e);
                        return None;
                    }
                },
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!("Failed to read blueprint {}: {}", path.display(), e);
                    return None;
                }
            }
        }
        None
    }
}

/// Read a YAML field map; a missing or empty file is empty content
async fn read_fields(path: &Path) -> RepositoryResult<FieldMap> {
    let source = match fs::read_to_string(path).await {
        Ok(source) => source,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(FieldMap::new()),
        Err(e) => return Err(e.into()),
    };

    match serde_yaml::from_str::<Value>(&source)? {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(FieldMap::new()),
        _ => Err(RepositoryError::InvalidContent(format!(
            "{} is not a field map",
            path.display()
        ))),
    }
}

async fn write_fields(path: &Path, fields: &FieldMap) -> RepositoryResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    let yaml = serde_yaml::to_string(fields)?;
    fs::write(path, yaml).await?;
    Ok(())
}

async fn modified_seconds(path: &Path) -> Option<i64> {
    let metadata = fs::metadata(path).await.ok()?;
    let modified = metadata.modified().ok()?;
    let seconds = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    i64::try_from(seconds).ok()
}

async fn remove_if_exists(path: &Path) -> RepositoryResult<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// `3_harder-better` -> (Some(3), "harder-better")
fn split_num(name: &str) -> (Option<i64>, String) {
    if let Some((prefix, slug)) = name.split_once('_') {
        if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(num) = prefix.parse() {
                return (Some(num), slug.to_string());
            }
        }
    }
    (None, name.to_string())
}

/// `sort: 3` and `sort: "3"` both sort as 3
fn sort_number(value: &Value) -> Option<i64> {
    match value {
        Value::Int(num) => Some(*num),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Default, Deserialize)]
struct Account {
    email: Option<String>,
    name: Option<String>,
    role: Option<String>,
}

#[derive(Debug, Clone)]
enum Detail {
    Page {
        template: String,
        status: PageStatus,
        num: Option<i64>,
        slug: String,
    },
    File {
        filename: String,
        parent_id: Option<String>,
    },
    User,
    Site,
}

/// Page, file, user or site stored on disk
#[derive(Debug)]
pub struct FileSystemEntity {
    layout: Arc<SiteLayout>,
    id: String,
    /// Directory holding the content files
    dir: PathBuf,
    /// Content file name without language code and extension
    stem: String,
    cacheable: bool,
    detail: Detail,
}

impl FileSystemEntity {
    fn content_path(&self, language: Option<&str>) -> PathBuf {
        self.layout.content_file(&self.dir, &self.stem, language)
    }

    /// Content file of a variant; untranslated variants fall back to the
    /// default language
    async fn existing_content_path(&self, language: Option<&str>) -> Option<PathBuf> {
        let path = self.content_path(language);
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Some(path);
        }
        let default = self.layout.languages.codes().first()?;
        let fallback = self.content_path(Some(default));
        match fs::try_exists(&fallback).await {
            Ok(true) => Some(fallback),
            _ => None,
        }
    }

    /// Directory of the entity itself (page or account directory)
    pub fn path(&self) -> &Path {
        &self.dir
    }

    async fn account(&self) -> RepositoryResult<Account> {
        let path = self.dir.join(format!("index{}", YAML_EXTENSION));
        let source = match fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RepositoryError::NotFound {
                    path: path.display().to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_yaml::from_str(&source)?)
    }

    /// Content of the default language, independent of the current one
    async fn default_content(&self) -> FieldMap {
        let default = self.layout.languages.codes().first().map(String::as_str);
        self.read_content(default).await.unwrap_or_default()
    }

    async fn load_schema(&self) -> Option<Blueprint> {
        let layout = &self.layout;
        match &self.detail {
            Detail::Page { template, .. } => {
                layout
                    .blueprint(Some("pages"), &[template.as_str(), DEFAULT_BLUEPRINT])
                    .await
            }
            Detail::File { .. } => {
                let content = self.default_content().await;
                let template = content
                    .get("template")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_BLUEPRINT)
                    .to_string();
                layout
                    .blueprint(Some("files"), &[template.as_str(), DEFAULT_BLUEPRINT])
                    .await
            }
            Detail::User => {
                let role = self
                    .account()
                    .await
                    .ok()
                    .and_then(|account| account.role)
                    .unwrap_or_else(|| DEFAULT_ROLE.to_string());
                layout
                    .blueprint(Some("users"), &[role.as_str(), DEFAULT_BLUEPRINT])
                    .await
            }
            Detail::Site => layout.blueprint(None, &[SITE_ID]).await,
        }
    }

    async fn has_children(&self) -> RepositoryResult<bool> {
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl ContentEntity for FileSystemEntity {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> EntityKind {
        match self.detail {
            Detail::Page { .. } => EntityKind::Page,
            Detail::File { .. } => EntityKind::File,
            Detail::User => EntityKind::User,
            Detail::Site => EntityKind::Site,
        }
    }

    fn class_name(&self) -> &str {
        match self.detail {
            Detail::Page { .. } => "Page",
            Detail::File { .. } => "File",
            Detail::User => "User",
            Detail::Site => "Site",
        }
    }

    fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    async fn uuid(&self) -> Option<String> {
        self.default_content()
            .await
            .get("uuid")
            .and_then(Value::as_str)
            .filter(|uuid| !uuid.is_empty())
            .map(str::to_string)
    }

    async fn kind_meta(&self, language: Option<&str>) -> RepositoryResult<KindMeta> {
        match &self.detail {
            Detail::Page {
                template,
                status,
                num,
                slug,
            } => Ok(KindMeta::Page {
                template: template.clone(),
                status: *status,
                num: *num,
                slug: slug.clone(),
            }),
            Detail::File {
                filename,
                parent_id,
            } => {
                let content = self.read_content(language).await?;
                Ok(KindMeta::File {
                    filename: filename.clone(),
                    mime_type: mime_guess::from_path(filename)
                        .first()
                        .map(|mime| mime.essence_str().to_string()),
                    template: content
                        .get("template")
                        .and_then(Value::as_str)
                        .filter(|template| !template.is_empty())
                        .map(str::to_string),
                    sort: content.get("sort").and_then(sort_number),
                    parent: parent_id
                        .as_deref()
                        .map(|id| derive_key(id, language, &self.layout.languages)),
                })
            }
            Detail::User => {
                let account = self.account().await?;
                let email = account.email.ok_or_else(|| {
                    RepositoryError::InvalidContent(format!("user '{}' has no email", self.id))
                })?;
                Ok(KindMeta::User {
                    email,
                    name: account.name,
                    role: account.role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
                })
            }
            Detail::Site => Ok(KindMeta::Site),
        }
    }

    async fn schema(&self) -> Option<Arc<dyn SchemaLookup>> {
        self.load_schema()
            .await
            .map(|blueprint| Arc::new(blueprint) as Arc<dyn SchemaLookup>)
    }

    async fn read_content(&self, language: Option<&str>) -> RepositoryResult<FieldMap> {
        match self.existing_content_path(language).await {
            Some(path) => read_fields(&path).await,
            None => Ok(FieldMap::new()),
        }
    }

    async fn write_content(&self, fields: &FieldMap, language: Option<&str>) -> RepositoryResult<()> {
        write_fields(&self.content_path(language), fields).await
    }

    async fn delete(&self, force: bool) -> RepositoryResult<()> {
        match &self.detail {
            Detail::Page { .. } => {
                if !force && self.has_children().await? {
                    return Err(RepositoryError::HasChildren {
                        id: self.id.clone(),
                    });
                }
                fs::remove_dir_all(&self.dir).await?;
            }
            Detail::File { filename, .. } => {
                remove_if_exists(&self.dir.join(filename)).await?;
                for language in self.layout.languages.variants() {
                    remove_if_exists(&self.content_path(language.as_deref())).await?;
                }
            }
            Detail::User => fs::remove_dir_all(&self.dir).await?,
            Detail::Site => {
                return Err(RepositoryError::Unsupported(
                    "the site cannot be deleted".to_string(),
                ))
            }
        }
        debug!("Deleted {} '{}'", self.kind(), self.id);
        Ok(())
    }

    async fn modified(&self, language: Option<&str>) -> Option<i64> {
        let content = match self.existing_content_path(language).await {
            Some(path) => modified_seconds(&path).await,
            None => None,
        };
        match &self.detail {
            Detail::File { filename, .. } => {
                let asset = modified_seconds(&self.dir.join(filename)).await;
                content.max(asset)
            }
            _ => content,
        }
    }
}

/// Content source reading a site directory
pub struct FileSystemContentSource {
    layout: Arc<SiteLayout>,
}

impl FileSystemContentSource {
    /// Create a content source rooted at a site directory
    ///
    /// # Example
    /// ```no_run
    /// use khulan_core::Languages;
    /// use khulan_repository::FileSystemContentSource;
    ///
    /// let source = FileSystemContentSource::new("site", Languages::single()).unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(root: P, languages: Languages) -> RepositoryResult<Self> {
        let path = root.as_ref();

        if !path.exists() {
            return Err(RepositoryError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        let root = path
            .absolutize()
            .map_err(|e| RepositoryError::Other(format!("Failed to absolutize path: {}", e)))?
            .to_path_buf();

        Ok(Self {
            layout: Arc::new(SiteLayout { root, languages }),
        })
    }

    pub fn from_config(config: &SourceConfig) -> RepositoryResult<Self> {
        config
            .validate()
            .map_err(|e| RepositoryError::Other(e.to_string()))?;
        Self::new(&config.root, config.languages())
    }

    pub fn root(&self) -> &Path {
        &self.layout.root
    }

    fn entity(&self, id: String, dir: PathBuf, stem: String, cacheable: bool, detail: Detail) -> FileSystemEntity {
        FileSystemEntity {
            layout: self.layout.clone(),
            id,
            dir,
            stem,
            cacheable,
            detail,
        }
    }

    fn site_entity(&self) -> FileSystemEntity {
        self.entity(
            SITE_ID.to_string(),
            self.layout.content_dir(),
            SITE_ID.to_string(),
            true,
            Detail::Site,
        )
    }

    /// Content stems and asset names of a directory
    async fn list_dir(&self, dir: &Path) -> RepositoryResult<(BTreeSet<String>, BTreeSet<String>, Vec<PathBuf>)> {
        let mut stems = BTreeSet::new();
        let mut assets = BTreeSet::new();
        let mut subdirs = Vec::new();

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((stems, assets, subdirs)),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                subdirs.push(entry.path());
            } else if let Some(stem) = self.layout.content_stem(&name) {
                stems.insert(stem);
            } else {
                assets.insert(name);
            }
        }
        subdirs.sort();
        Ok((stems, assets, subdirs))
    }

    async fn scan_pages(&self) -> RepositoryResult<Vec<FileSystemEntity>> {
        let mut pages = Vec::new();
        // (directory, parent page id, inside a drafts folder)
        let mut pending: Vec<(PathBuf, Option<String>, bool)> =
            vec![(self.layout.content_dir(), None, false)];

        while let Some((dir, parent_id, drafts)) = pending.pop() {
            let (_, _, subdirs) = self.list_dir(&dir).await?;
            for subdir in subdirs {
                let name = subdir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if name == DRAFTS_DIR {
                    pending.push((subdir, parent_id.clone(), true));
                    continue;
                }

                let (num, slug) = split_num(&name);
                let status = if drafts {
                    PageStatus::Draft
                } else if num.is_some() {
                    PageStatus::Listed
                } else {
                    PageStatus::Unlisted
                };
                let id = match &parent_id {
                    Some(parent) => format!("{}/{}", parent, slug),
                    None => slug.clone(),
                };

                let (stems, assets, _) = self.list_dir(&subdir).await?;
                let template = stems
                    .iter()
                    .find(|stem| !assets.contains(*stem))
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_BLUEPRINT.to_string());
                let cacheable = self
                    .layout
                    .blueprint(Some("pages"), &[template.as_str(), DEFAULT_BLUEPRINT])
                    .await
                    .map_or(true, |blueprint| blueprint.is_cacheable());

                pending.push((subdir.clone(), Some(id.clone()), false));
                pages.push(self.entity(
                    id,
                    subdir,
                    template.clone(),
                    cacheable,
                    Detail::Page {
                        template,
                        status,
                        num: if drafts { None } else { num },
                        slug,
                    },
                ));
            }
        }

        pages.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pages)
    }

    async fn scan_files(&self, owners: &[(Option<String>, PathBuf, bool)]) -> RepositoryResult<Vec<FileSystemEntity>> {
        let mut files = Vec::new();
        for (owner_id, dir, cacheable) in owners {
            let (_, assets, _) = self.list_dir(dir).await?;
            for filename in assets {
                let id = match owner_id {
                    Some(owner) => format!("{}/{}", owner, filename),
                    None => filename.clone(),
                };
                files.push(self.entity(
                    id,
                    dir.clone(),
                    filename.clone(),
                    *cacheable,
                    Detail::File {
                        filename,
                        parent_id: owner_id.clone(),
                    },
                ));
            }
        }
        Ok(files)
    }

    async fn scan_users(&self) -> RepositoryResult<Vec<FileSystemEntity>> {
        let (_, _, subdirs) = self.list_dir(&self.layout.accounts_dir()).await?;
        let mut users = Vec::new();
        for dir in subdirs {
            let id = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let user = self.entity(id, dir, "user".to_string(), true, Detail::User);

            let account = match user.account().await {
                Ok(account) => account,
                Err(e) => {
                    warn!("Skipping account '{}': {}", user.id, e);
                    continue;
                }
            };
            let role = account.role.unwrap_or_else(|| DEFAULT_ROLE.to_string());
            let cacheable = self
                .layout
                .blueprint(Some("users"), &[role.as_str(), DEFAULT_BLUEPRINT])
                .await
                .map_or(true, |blueprint| blueprint.is_cacheable());

            users.push(FileSystemEntity { cacheable, ..user });
        }
        Ok(users)
    }
}

fn shared(entities: Vec<FileSystemEntity>) -> Vec<Arc<dyn ContentEntity>> {
    entities
        .into_iter()
        .map(|entity| Arc::new(entity) as Arc<dyn ContentEntity>)
        .collect()
}

#[async_trait]
impl ContentSource for FileSystemContentSource {
    fn languages(&self) -> &Languages {
        &self.layout.languages
    }

    async fn site(&self) -> RepositoryResult<Arc<dyn ContentEntity>> {
        Ok(Arc::new(self.site_entity()))
    }

    async fn pages(&self) -> RepositoryResult<Vec<Arc<dyn ContentEntity>>> {
        Ok(shared(self.scan_pages().await?))
    }

    async fn files(&self) -> RepositoryResult<Vec<Arc<dyn ContentEntity>>> {
        let mut owners = vec![(None, self.layout.content_dir(), true)];
        for page in self.scan_pages().await? {
            owners.push((Some(page.id.clone()), page.dir.clone(), page.cacheable));
        }
        Ok(shared(self.scan_files(&owners).await?))
    }

    async fn users(&self) -> RepositoryResult<Vec<Arc<dyn ContentEntity>>> {
        Ok(shared(self.scan_users().await?))
    }
}
