// ============================================================================
// 规则配置 (Rule Profiles)
// ============================================================================
//
// 一个 profile 是两组 key -> {bool | number | string}:
//   { "style": {...}, "testing": {...} }
//
// 生命周期:
// 1. 每次运行加载一次 (内置 profile 用 include_str! 打包进二进制)
// 2. 显式覆盖项按顺序整体替换旧值 (后者胜出，不做部分合并)
// 3. 解析成强类型 Settings，之后只读，被所有规则共享
//
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PrecheckError;

/// 内置 profile (名称不区分大小写)
const BUILTIN_PROFILES: &[(&str, &str)] = &[
    ("CS2114", include_str!("../profiles/cs2114.rules.json")),
    ("strict", include_str!("../profiles/strict.rules.json")),
];

pub const DEFAULT_PROFILE: &str = "CS2114";

/// A single profile value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Setting {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl Setting {
    /// Parse a command-line literal: `true`/`false`, an integer, else text
    pub fn parse_literal(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "true" => Setting::Bool(true),
            "false" => Setting::Bool(false),
            _ => raw.parse::<i64>()
                .map(Setting::Number)
                .unwrap_or_else(|_| Setting::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Bool(b) => write!(f, "{b}"),
            Setting::Number(n) => write!(f, "{n}"),
            Setting::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Style,
    Testing,
}

impl Group {
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Style => "style",
            Group::Testing => "testing",
        }
    }
}

impl FromStr for Group {
    type Err = PrecheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "style" => Ok(Group::Style),
            "testing" => Ok(Group::Testing),
            other => Err(PrecheckError::InvalidSetting {
                key: other.to_string(),
                reason: "group must be \"style\" or \"testing\"".to_string(),
            }),
        }
    }
}

/// Raw two-group profile document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub style: BTreeMap<String, Setting>,
    #[serde(default)]
    pub testing: BTreeMap<String, Setting>,
}

impl Profile {
    pub fn builtin_names() -> Vec<&'static str> {
        BUILTIN_PROFILES.iter().map(|(name, _)| *name).collect()
    }

    /// Load a built-in profile by name, or a profile file by path
    pub fn load(name_or_path: &str) -> Result<Self, PrecheckError> {
        if let Some((name, body)) = BUILTIN_PROFILES.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(name_or_path))
        {
            debug!("using built-in profile {name}");
            return Self::from_json(name, body);
        }

        let path = Path::new(name_or_path);
        if path.is_file() {
            return Self::from_file(path);
        }

        Err(PrecheckError::UnknownProfile(name_or_path.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, PrecheckError> {
        let name = path.to_string_lossy().to_string();
        let text = fs::read_to_string(path).map_err(|e| PrecheckError::InvalidProfile {
            name: name.clone(),
            reason: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&name, &text),
            _ => Self::from_json(&name, &text),
        }
    }

    pub fn from_json(name: &str, text: &str) -> Result<Self, PrecheckError> {
        let mut profile: Profile = serde_json::from_str(text).map_err(|e| {
            PrecheckError::InvalidProfile { name: name.to_string(), reason: e.to_string() }
        })?;
        profile.name = name.to_string();
        Ok(profile)
    }

    pub fn from_yaml(name: &str, text: &str) -> Result<Self, PrecheckError> {
        let mut profile: Profile = serde_yaml::from_str(text).map_err(|e| {
            PrecheckError::InvalidProfile { name: name.to_string(), reason: e.to_string() }
        })?;
        profile.name = name.to_string();
        Ok(profile)
    }

    fn group_mut(&mut self, group: Group) -> &mut BTreeMap<String, Setting> {
        match group {
            Group::Style => &mut self.style,
            Group::Testing => &mut self.testing,
        }
    }

    pub fn get(&self, group: Group, key: &str) -> Option<&Setting> {
        match group {
            Group::Style => self.style.get(key),
            Group::Testing => self.testing.get(key),
        }
    }

    /// Apply explicit settings in order; each one replaces the whole value
    pub fn apply(&mut self, overrides: &[Override]) {
        for o in overrides {
            debug!("override {}.{} = {}", o.group.as_str(), o.key, o.value);
            self.group_mut(o.group).insert(o.key.clone(), o.value.clone());
        }
    }
}

/// Explicit `group.key=value` setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub group: Group,
    pub key: String,
    pub value: Setting,
}

impl Override {
    pub fn new(group: Group, key: &str, value: Setting) -> Self {
        Self { group, key: key.to_string(), value }
    }
}

impl FromStr for Override {
    type Err = PrecheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PrecheckError::InvalidSetting {
            key: s.to_string(),
            reason: reason.to_string(),
        };

        let (path, value) = s.split_once('=').ok_or_else(|| invalid("expected group.key=value"))?;
        let (group, key) = path.trim().split_once('.').ok_or_else(|| invalid("expected group.key=value"))?;
        if key.is_empty() {
            return Err(invalid("empty key"));
        }

        Ok(Override {
            group: group.parse()?,
            key: key.to_string(),
            value: Setting::parse_literal(value),
        })
    }
}

// ============================================================================
// 强类型配置
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleSettings {
    /// ≤0 disables the indentation check
    pub spaces_per_indent: i64,
    pub no_tabs: bool,
    /// ≤0 disables the length check
    pub max_line_length: i64,
    pub one_public_class_per_file: bool,
    pub disallow_global_variables: bool,
    pub no_empty_methods: bool,
    pub no_unused_methods: bool,
    pub javadoc_required: bool,
    pub javadoc_require_author: bool,
    pub javadoc_require_version: bool,
    pub javadoc_check_params: bool,
    pub javadoc_check_return: bool,
    pub require_override: bool,
    pub closing_brace_alone: bool,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            spaces_per_indent: 4,
            no_tabs: false,
            max_line_length: -1,
            one_public_class_per_file: false,
            disallow_global_variables: false,
            no_empty_methods: false,
            no_unused_methods: false,
            javadoc_required: false,
            javadoc_require_author: false,
            javadoc_require_version: false,
            javadoc_check_params: false,
            javadoc_check_return: false,
            require_override: false,
            closing_brace_alone: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestingSettings {
    pub test_file_suffix: String,
    pub annotation_required: bool,
    /// Empty prefix disables the naming check
    pub test_methods_prefix: String,
    pub require_assert_equals_delta: bool,
    pub require_full_method_coverage: bool,
    pub require_full_branch_coverage: bool,
    pub fail_on_test_failures: bool,
}

impl Default for TestingSettings {
    fn default() -> Self {
        Self {
            test_file_suffix: "Test.java".to_string(),
            annotation_required: false,
            test_methods_prefix: "test".to_string(),
            require_assert_equals_delta: false,
            require_full_method_coverage: false,
            require_full_branch_coverage: false,
            fail_on_test_failures: false,
        }
    }
}

/// Fully resolved, immutable configuration shared by every rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub profile: String,
    pub style: StyleSettings,
    pub testing: TestingSettings,
}

const STYLE_KEYS: &[&str] = &[
    "spaces_per_indent", "no_tabs", "max_line_length", "one_public_class_per_file",
    "disallow_global_variables", "no_empty_methods", "no_unused_methods", "javadoc_required",
    "javadoc_require_author", "javadoc_require_version", "javadoc_check_params",
    "javadoc_check_return", "require_override", "closing_brace_alone",
];

const TESTING_KEYS: &[&str] = &[
    "test_file_suffix", "annotation_required", "test_methods_prefix",
    "require_assert_equals_delta", "require_full_method_coverage",
    "require_full_branch_coverage", "fail_on_test_failures",
];

struct Resolver<'a> {
    profile: &'a Profile,
    group: Group,
}

impl Resolver<'_> {
    fn mismatch(&self, key: &str, expected: &str, found: &Setting) -> PrecheckError {
        PrecheckError::InvalidSetting {
            key: format!("{}.{key}", self.group.as_str()),
            reason: format!("expected {expected}, found {found}"),
        }
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, PrecheckError> {
        match self.profile.get(self.group, key) {
            None => Ok(default),
            Some(Setting::Bool(b)) => Ok(*b),
            Some(other) => Err(self.mismatch(key, "a boolean", other)),
        }
    }

    fn number(&self, key: &str, default: i64) -> Result<i64, PrecheckError> {
        match self.profile.get(self.group, key) {
            None => Ok(default),
            Some(Setting::Number(n)) => Ok(*n),
            Some(other) => Err(self.mismatch(key, "a number", other)),
        }
    }

    fn text(&self, key: &str, default: &str) -> Result<String, PrecheckError> {
        match self.profile.get(self.group, key) {
            None => Ok(default.to_string()),
            Some(Setting::Text(s)) => Ok(s.clone()),
            Some(other) => Err(self.mismatch(key, "a string", other)),
        }
    }
}

impl Settings {
    pub fn resolve(profile: &Profile) -> Result<Self, PrecheckError> {
        for key in profile.style.keys().filter(|k| !STYLE_KEYS.contains(&k.as_str())) {
            warn!("profile {}: unknown style setting {key} ignored", profile.name);
        }
        for key in profile.testing.keys().filter(|k| !TESTING_KEYS.contains(&k.as_str())) {
            warn!("profile {}: unknown testing setting {key} ignored", profile.name);
        }

        let d = StyleSettings::default();
        let s = Resolver { profile, group: Group::Style };
        let style = StyleSettings {
            spaces_per_indent: s.number("spaces_per_indent", d.spaces_per_indent)?,
            no_tabs: s.flag("no_tabs", d.no_tabs)?,
            max_line_length: s.number("max_line_length", d.max_line_length)?,
            one_public_class_per_file: s.flag("one_public_class_per_file", d.one_public_class_per_file)?,
            disallow_global_variables: s.flag("disallow_global_variables", d.disallow_global_variables)?,
            no_empty_methods: s.flag("no_empty_methods", d.no_empty_methods)?,
            no_unused_methods: s.flag("no_unused_methods", d.no_unused_methods)?,
            javadoc_required: s.flag("javadoc_required", d.javadoc_required)?,
            javadoc_require_author: s.flag("javadoc_require_author", d.javadoc_require_author)?,
            javadoc_require_version: s.flag("javadoc_require_version", d.javadoc_require_version)?,
            javadoc_check_params: s.flag("javadoc_check_params", d.javadoc_check_params)?,
            javadoc_check_return: s.flag("javadoc_check_return", d.javadoc_check_return)?,
            require_override: s.flag("require_override", d.require_override)?,
            closing_brace_alone: s.flag("closing_brace_alone", d.closing_brace_alone)?,
        };

        let d = TestingSettings::default();
        let t = Resolver { profile, group: Group::Testing };
        let testing = TestingSettings {
            test_file_suffix: t.text("test_file_suffix", &d.test_file_suffix)?,
            annotation_required: t.flag("annotation_required", d.annotation_required)?,
            test_methods_prefix: t.text("test_methods_prefix", &d.test_methods_prefix)?,
            require_assert_equals_delta: t.flag("require_assert_equals_delta", d.require_assert_equals_delta)?,
            require_full_method_coverage: t.flag("require_full_method_coverage", d.require_full_method_coverage)?,
            require_full_branch_coverage: t.flag("require_full_branch_coverage", d.require_full_branch_coverage)?,
            fail_on_test_failures: t.flag("fail_on_test_failures", d.fail_on_test_failures)?,
        };

        Ok(Settings {
            profile: profile.name.clone(),
            style,
            testing,
        })
    }

    /// Load, override, resolve: the whole configuration lifecycle
    pub fn load(name_or_path: &str, overrides: &[Override]) -> Result<Self, PrecheckError> {
        let mut profile = Profile::load(name_or_path)?;
        profile.apply(overrides);
        Self::resolve(&profile)
    }
}
