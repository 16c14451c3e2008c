// ============================================================================
// 项目侦测模块 - 源码目录、构建描述文件、报告路径
// ============================================================================

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::{anyhow, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::PrecheckError;
use crate::scanner::SourceUnit;

/// Name given to a unit read from standard input
pub const STDIN_UNIT: &str = "stdin.java";

pub const SOURCE_DIR: &str = "src";
pub const BUILD_DESCRIPTOR: &str = "pom.xml";
pub const JACOCO_REPORT: &str = "target/site/jacoco/jacoco.xml";
pub const SUREFIRE_REPORTS: &str = "target/surefire-reports";

// ============================================================================
// Maven 依赖与插件
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    #[default]
    Compile,
    Test,
    Runtime,
    Provided,
    System,
    Import,
}

impl FromStr for DependencyScope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "test" => DependencyScope::Test,
            "runtime" => DependencyScope::Runtime,
            "provided" => DependencyScope::Provided,
            "system" => DependencyScope::System,
            "import" => DependencyScope::Import,
            _ => DependencyScope::Compile,
        })
    }
}

/// `<dependency>` or `<plugin>` coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: DependencyScope,
}

impl Artifact {
    pub fn coordinate(&self) -> String {
        match &self.group_id {
            Some(group) => format!("{group}:{}", self.artifact_id),
            None => self.artifact_id.clone(),
        }
    }
}

/// What the checker needs to know about `pom.xml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildDescriptor {
    pub dependencies: Vec<Artifact>,
    /// Active `<build><plugins>` only; `<pluginManagement>` is declarative
    pub plugins: Vec<Artifact>,
}

impl BuildDescriptor {
    pub fn has_jacoco_plugin(&self) -> bool {
        self.plugins.iter().any(|p| p.artifact_id == "jacoco-maven-plugin")
    }

    pub fn has_junit(&self) -> bool {
        self.dependencies.iter().any(|d| {
            d.artifact_id == "junit"
                || d.artifact_id.starts_with("junit-jupiter")
                || d.group_id.as_deref() == Some("org.junit.jupiter")
        })
    }
}

#[derive(Default)]
struct PartialArtifact {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    scope: Option<String>,
}

impl PartialArtifact {
    fn finish(self) -> Option<Artifact> {
        Some(Artifact {
            group_id: self.group_id,
            artifact_id: self.artifact_id?,
            version: self.version,
            scope: self.scope.and_then(|s| s.parse().ok()).unwrap_or_default(),
        })
    }
}

/// Parse `pom.xml`: project dependencies and active build plugins
///
/// Dependencies declared inside a plugin, `<dependencyManagement>` and
/// `<pluginManagement>` sections are not collected. Comments are skipped.
pub fn parse_maven_pom(content: &str) -> Result<BuildDescriptor> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut descriptor = BuildDescriptor::default();
    let mut buf = Vec::new();

    // State tracking
    let mut in_management = 0usize;
    let mut in_plugin = false;
    let mut in_plugin_deps = false;
    let mut in_dependency = false;
    let mut current: Option<PartialArtifact> = None;
    let mut current_element: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "dependencyManagement" | "pluginManagement" => in_management += 1,
                    "plugin" if in_management == 0 => {
                        in_plugin = true;
                        current = Some(PartialArtifact::default());
                    }
                    "dependencies" if in_plugin => in_plugin_deps = true,
                    "dependency" if in_management == 0 && !in_plugin => {
                        in_dependency = true;
                        current = Some(PartialArtifact::default());
                    }
                    "groupId" | "artifactId" | "version" | "scope"
                        if current.is_some() && !in_plugin_deps =>
                    {
                        current_element = Some(name);
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "dependencyManagement" | "pluginManagement" => {
                        in_management = in_management.saturating_sub(1);
                    }
                    "dependencies" if in_plugin => in_plugin_deps = false,
                    "plugin" if in_plugin => {
                        in_plugin = false;
                        if let Some(plugin) = current.take().and_then(PartialArtifact::finish) {
                            descriptor.plugins.push(plugin);
                        }
                    }
                    "dependency" if in_dependency => {
                        in_dependency = false;
                        if let Some(dep) = current.take().and_then(PartialArtifact::finish) {
                            descriptor.dependencies.push(dep);
                        }
                    }
                    "groupId" | "artifactId" | "version" | "scope" => current_element = None,
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(element), Some(partial)) = (&current_element, current.as_mut()) {
                    let text = e.unescape()?.to_string();
                    match element.as_str() {
                        "groupId" => partial.group_id = Some(text),
                        "artifactId" => partial.artifact_id = Some(text),
                        "version" => partial.version = Some(text),
                        "scope" => partial.scope = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("XML parse error: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(descriptor)
}

// ============================================================================
// 项目布局
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub root: PathBuf,
    /// Every `*.java` below `src/`, sorted
    pub sources: Vec<PathBuf>,
    pub build: Option<BuildDescriptor>,
}

impl Project {
    /// Validate the layout and discover sources
    pub fn detect(root: &Path) -> Result<Self> {
        let src = root.join(SOURCE_DIR);
        if !src.is_dir() {
            return Err(PrecheckError::MissingSourceDir(src).into());
        }

        let sources = discover_sources(&src);
        info!("{} Java file(s) under {}", sources.len(), src.display());

        let pom = root.join(BUILD_DESCRIPTOR);
        let build = if pom.is_file() {
            let content = fs::read_to_string(&pom)
                .with_context(|| format!("failed to read {}", pom.display()))?;
            match parse_maven_pom(&content) {
                Ok(descriptor) => {
                    debug!(
                        "{}: {} dependencies, {} plugins",
                        pom.display(),
                        descriptor.dependencies.len(),
                        descriptor.plugins.len()
                    );
                    Some(descriptor)
                }
                Err(e) => {
                    warn!("ignoring unparsable {}: {e}", pom.display());
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            root: root.to_path_buf(),
            sources,
            build,
        })
    }

    pub fn jacoco_report(&self) -> PathBuf {
        self.root.join(JACOCO_REPORT)
    }

    pub fn surefire_dir(&self) -> PathBuf {
        self.root.join(SUREFIRE_REPORTS)
    }

    /// Warn about a build that will not produce what the coverage phase reads
    pub fn check_build_for_tests(&self) {
        match &self.build {
            None => warn!("no {} in {}", BUILD_DESCRIPTOR, self.root.display()),
            Some(build) => {
                if !build.has_jacoco_plugin() {
                    warn!("{} has no jacoco-maven-plugin; coverage report will be missing", BUILD_DESCRIPTOR);
                }
                if !build.has_junit() {
                    warn!("{} declares no JUnit dependency", BUILD_DESCRIPTOR);
                }
            }
        }
    }
}

/// `*.java` files below `dir` in path order
pub fn discover_sources(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("java"))
        .collect();
    files.sort();
    files
}

/// Read a single unit from a reader (standard input)
pub fn read_stdin_unit(mut reader: impl Read) -> Result<SourceUnit> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| PrecheckError::Input(e.to_string()))?;
    Ok(SourceUnit::new(STDIN_UNIT, text))
}
