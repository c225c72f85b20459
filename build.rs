use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Directories holding the crate's own Rust sources.
const SOURCE_DIRS: [&str; 8] = [
    "risk", "convert", "outcome", "evaluate", "shared", "cli", "tests", "benches",
];

const FORBIDDEN_WORDS: [&str; 14] = [
    "FIXED",
    "CORRECTED",
    "FIX",
    "FIXES",
    "NEW",
    "CHANGED",
    "CHANGES",
    "CHANGE",
    "MODIFIED",
    "MODIFIES",
    "MODIFY",
    "UPDATED",
    "UPDATES",
    "UPDATE",
];

// One source policy: the regex that selects candidate lines, a filter that
// decides whether a candidate really violates it, and the advice printed.
#[derive(Clone, Copy)]
enum Rule {
    UnderscorePrefix,
    ForbiddenWords,
    StarsInComment,
    AllCapsComment,
    AllowDeadCode,
}

impl Rule {
    const ALL: [Rule; 5] = [
        Rule::UnderscorePrefix,
        Rule::ForbiddenWords,
        Rule::StarsInComment,
        Rule::AllCapsComment,
        Rule::AllowDeadCode,
    ];

    fn pattern(self) -> String {
        match self {
            Rule::UnderscorePrefix => r"\b(_[a-zA-Z0-9_]+)\b".to_string(),
            Rule::ForbiddenWords => format!("(//|/\\*).*(?:{})", FORBIDDEN_WORDS.join("|")),
            Rule::StarsInComment => r"(//|/\*).*\*\*".to_string(),
            Rule::AllCapsComment => r"(//|/\*).*".to_string(),
            Rule::AllowDeadCode => r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]".to_string(),
        }
    }

    fn is_violation(self, line: &str) -> bool {
        match self {
            Rule::UnderscorePrefix => !is_comment(line) && !underscore_only_in_strings(line),
            Rule::ForbiddenWords | Rule::AllowDeadCode => true,
            Rule::StarsInComment => !is_doc_comment(line),
            Rule::AllCapsComment => comment_text(line).is_some_and(|text| {
                let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
                !letters.is_empty() && letters.iter().all(|c| c.is_uppercase())
            }),
        }
    }

    fn headline(self) -> &'static str {
        match self {
            Rule::UnderscorePrefix => "underscore-prefixed variables",
            Rule::ForbiddenWords => "forbidden comment words",
            Rule::StarsInComment => "'**' patterns in regular comments",
            Rule::AllCapsComment => "comments with all uppercase alphabetic characters",
            Rule::AllowDeadCode => "#[allow(dead_code)] attributes",
        }
    }

    fn advice(self) -> String {
        match self {
            Rule::UnderscorePrefix => "Underscore-prefixed variable names are not allowed in this project.\n   \
                 Either use the variable (removing the underscore) or remove it completely."
                .to_string(),
            Rule::ForbiddenWords => format!(
                "Comments containing {} are STRICTLY FORBIDDEN in this project.\n   \
                 Remove them completely rather than commenting them out.",
                FORBIDDEN_WORDS.map(|w| format!("'{w}'")).join(", ")
            ),
            Rule::StarsInComment => {
                "The '**' pattern is not allowed in regular comments (but is allowed in doc comments)."
                    .to_string()
            }
            Rule::AllCapsComment => "Comments where all alphabetic characters are uppercase are STRICTLY FORBIDDEN in this project.\n   \
                 STRONGLY CONSIDER deleting the comment completely."
                .to_string(),
            Rule::AllowDeadCode => "#[allow(dead_code)] attributes are STRICTLY FORBIDDEN in this project.\n   \
                 Either use the code (removing the attribute) or remove it completely."
                .to_string(),
        }
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("//") || line.contains("/*")
}

fn is_doc_comment(line: &str) -> bool {
    line.trim_start().starts_with("///") || line.trim_start().starts_with("//!")
}

// Text of a comment line with its marker removed, or None for code lines.
fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    for marker in ["///", "//!", "//"] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    let start = line.find("/*")? + 2;
    let body = &line[start..];
    Some(body.find("*/").map_or(body, |end| &body[..end]).trim())
}

// Odd-numbered pieces between double quotes are string contents.
fn underscore_only_in_strings(line: &str) -> bool {
    line.contains('"')
        && line
            .split('"')
            .enumerate()
            .any(|(i, part)| i % 2 == 1 && part.contains('_'))
}

// Collects every violating line of one file for one rule.
struct RuleCollector {
    rule: Rule,
    file_path: PathBuf,
    violations: Vec<String>,
}

impl RuleCollector {
    fn new(rule: Rule, file_path: &Path) -> Self {
        Self {
            rule,
            file_path: file_path.to_path_buf(),
            violations: Vec::new(),
        }
    }

    fn check_and_get_error_message(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }

        let mut error_msg = format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            self.violations.len(),
            self.rule.headline(),
            self.file_path.display()
        );
        for violation in &self.violations {
            error_msg.push_str(&format!("   {violation}\n"));
        }
        error_msg.push_str(&format!("\n⚠️ {}\n", self.rule.advice()));
        Some(error_msg)
    }
}

impl Sink for RuleCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if self.rule.is_violation(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn rust_sources() -> Vec<PathBuf> {
    SOURCE_DIRS
        .iter()
        .flat_map(|dir| WalkDir::new(dir).into_iter().filter_map(|e| e.ok()))
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

fn scan_sources() -> Result<(), Box<dyn Error>> {
    let sources = rust_sources();
    let mut searcher = Searcher::new();
    for rule in Rule::ALL {
        let matcher = RegexMatcher::new_line_matcher(&rule.pattern())?;
        for path in &sources {
            let mut collector = RuleCollector::new(rule, path);
            searcher.search_path(&matcher, path, &mut collector)?;
            if let Some(error_message) = collector.check_and_get_error_message() {
                return Err(error_message.into());
            }
        }
    }
    Ok(())
}

// Compiles this script on its own with the strict lints, so it obeys the
// same policy as the crate.
fn check_build_script_lints() {
    let Some(out_dir) = std::env::var_os("OUT_DIR") else {
        return;
    };
    let output = std::process::Command::new("rustc")
        .args([
            "--edition",
            "2021",
            "-D",
            "unused_variables",
            "-D",
            "dead_code",
            "-D",
            "unused_imports",
            "--crate-type",
            "bin",
            "--emit",
            "metadata",
            "--error-format",
            "human",
            "--out-dir",
        ])
        .arg(&out_dir)
        .arg("build.rs")
        .output();

    match output {
        Ok(output) if !output.status.success() => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let found = [
                ("unused variable", "Unused variables"),
                ("is never used", "Unused functions"),
                ("unused import", "Unused imports"),
            ]
            .into_iter()
            .find(|(needle, _)| stderr.contains(needle));
            if let Some((_, what)) = found {
                eprintln!("\n❌ ERROR: {what} detected in build.rs!");
                eprintln!("{stderr}");
                eprintln!("\n⚠️ {what} are STRICTLY FORBIDDEN in this project.");
                std::process::exit(1);
            }
        }
        Ok(_) => {}
        Err(_) => {
            println!("cargo:warning=Could not lint build.rs with rustc");
        }
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in SOURCE_DIRS {
        println!("cargo:rerun-if-changed={dir}");
    }

    check_build_script_lints();

    if let Err(e) = scan_sources() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
