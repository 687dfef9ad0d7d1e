//! Answer scanning: code blocks, package names, option paths, commands.
//!
//! The scorer, fact checker and source verifier all read the answer
//! through these functions so they agree on what counts as a package or
//! an option.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Option namespaces a dotted path must start with to be checked
pub const OPTION_PREFIXES: &[&str] = &[
    "services.",
    "boot.",
    "networking.",
    "hardware.",
    "system.",
    "environment.",
    "users.",
    "security.",
    "programs.",
    "virtualisation.",
    "nix.",
    "i18n.",
    "time.",
    "sound.",
    "fonts.",
    "xdg.",
];

/// Compile a pattern list, dropping any entry that fails to compile
pub(crate) fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

static CODE_BLOCK: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile_all(&[r"(?s)```(?:nix)?[ \t]*\r?\n(.*?)```"]));

static NIX_KEYWORD: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile_all(&[r"\b(?:with|let|in|import|pkgs|lib)\b"]));

/// Single-name package contexts
static PACKAGE_SINGLE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"\bpkgs\.([a-zA-Z0-9_-]+)",
        r"nix-env\s+-iA\s+nixos\.([a-zA-Z0-9_-]+)",
    ])
});

/// List package contexts whose capture holds several names
static PACKAGE_LIST: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"with\s+pkgs;\s*\[([^\]]+)\]",
        r"nix-shell\s+-p\s+([a-zA-Z0-9_\- \t]+)",
    ])
});

static LINE_COMMENT: LazyLock<Vec<Regex>> = LazyLock::new(|| compile_all(&[r"#[^\n]*"]));

static OPTION_PATH: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?:^|[^\w.])([a-zA-Z][a-zA-Z0-9_-]*(?:\.[a-zA-Z][a-zA-Z0-9_-]*)+)\s*=(?:[^=]|$)",
    ])
});

static COMMAND: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"\bnixos-rebuild\s+[a-z-]+",
        r"\bnix-env\s+[^;\n`]+",
        r"\bnix\s+(?:build|develop|run|shell|search|flake|profile|store|eval|repl|edit|log|registry|hash|copy)\b[^;\n`]*",
        r"\bsystemctl\s+[a-z-]+\s+[^;\n`]+",
        r"\bhome-manager\s+[a-z-]+",
        r"\bnix-shell\s+[^;\n`]+",
        r"\bnix-collect-garbage[^;\n`]*",
    ])
});

static QUOTED: LazyLock<Vec<Regex>> = LazyLock::new(|| compile_all(&[r#""([^"\n]{3,40})""#]));

/// Contents of fenced code blocks, in order of appearance
pub fn code_blocks(text: &str) -> Vec<String> {
    CODE_BLOCK
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|block| !block.is_empty())
        .collect()
}

/// Whether a block carries Nix structural tokens
pub fn looks_like_nix(block: &str) -> bool {
    block.contains(['{', '}', '=', ';']) || NIX_KEYWORD.iter().any(|re| re.is_match(block))
}

/// Fenced blocks that look like Nix expressions
pub fn nix_expressions(text: &str) -> Vec<String> {
    code_blocks(text)
        .into_iter()
        .filter(|block| looks_like_nix(block))
        .collect()
}

/// Whether a block declares both `inputs` and `outputs`
pub fn is_flake_block(block: &str) -> bool {
    block.contains("inputs") && block.contains("outputs")
}

/// First fenced block that is a flake, if any
pub fn flake_block(text: &str) -> Option<String> {
    code_blocks(text).into_iter().find(|b| is_flake_block(b))
}

/// Whether the answer talks about flakes at all
pub fn mentions_flake(text: &str) -> bool {
    ["inputs", "outputs", "flake.nix", "description ="]
        .iter()
        .any(|marker| text.contains(marker))
}

fn is_package_token(token: &str) -> bool {
    token.len() > 1
        && token != "with"
        && token != "pkgs"
        && !token.starts_with('-')
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Candidate package names, deduplicated in first-seen order
pub fn package_names(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut push = |name: &str| {
        let name = name.trim_matches(|c: char| "[]{}()\"',;".contains(c));
        if is_package_token(name) && seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    };

    // Scan in document order so the result is stable across patterns
    let mut hits: Vec<(usize, String)> = Vec::new();
    for re in PACKAGE_SINGLE.iter() {
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                hits.push((m.start(), m.as_str().to_string()));
            }
        }
    }
    for re in PACKAGE_LIST.iter() {
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                let mut list = m.as_str().to_string();
                for comment in LINE_COMMENT.iter() {
                    list = comment.replace_all(&list, " ").into_owned();
                }
                for (offset, token) in list.split_whitespace().enumerate() {
                    hits.push((m.start() + offset, token.to_string()));
                }
            }
        }
    }
    hits.sort_by_key(|(pos, _)| *pos);
    for (_, token) in hits {
        // `pkgs.foo` inside a list is already covered by the single pattern
        let token = token.strip_prefix("pkgs.").unwrap_or(&token).to_string();
        push(&token);
    }
    names
}

/// Whether a dotted path sits under a known NixOS namespace
pub fn is_known_option(path: &str) -> bool {
    OPTION_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Dotted option paths assigned in the answer, known namespaces only
pub fn option_paths(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    OPTION_PATH
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|path| is_known_option(path))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Shell command invocations, deduplicated in first-seen order
pub fn commands(text: &str) -> Vec<String> {
    let mut hits: Vec<(usize, String)> = COMMAND
        .iter()
        .flat_map(|re| re.find_iter(text))
        .map(|m| (m.start(), m.as_str().trim().to_string()))
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    hits.into_iter()
        .map(|(_, cmd)| cmd)
        .filter(|cmd| !cmd.is_empty() && seen.insert(cmd.clone()))
        .collect()
}

/// Binary name of a command line
pub fn command_binary(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

/// Quoted substrings, used as search terms of last resort
pub fn quoted_strings(text: &str) -> Vec<String> {
    QUOTED
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Lowercased words with surrounding punctuation removed
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Words longer than three characters, the unit of lexical overlap
pub fn significant_words(text: &str) -> Vec<String> {
    words(text).into_iter().filter(|w| w.len() > 3).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = r#"Add this to configuration.nix:

```nix
{ pkgs, ... }:
{
  environment.systemPackages = with pkgs; [
    firefox # browser
    git
  ];
  services.openssh.enable = true;
  boot.loader.systemd-boot.enable = true;
}
```

Then run `sudo nixos-rebuild switch` or try `nix-shell -p htop ripgrep`.
"#;

    #[test]
    fn test_code_blocks_and_nix_detection() {
        let blocks = code_blocks(ANSWER);
        assert_eq!(blocks.len(), 1);
        assert!(looks_like_nix(&blocks[0]));
        assert_eq!(nix_expressions(ANSWER).len(), 1);
        assert!(flake_block(ANSWER).is_none());
    }

    #[test]
    fn test_package_names_skip_comments_and_keywords() {
        let names = package_names(ANSWER);
        assert_eq!(names, vec!["firefox", "git", "htop", "ripgrep"]);
    }

    #[test]
    fn test_pkgs_inside_nixpkgs_is_not_a_package() {
        let names = package_names("inputs.nixpkgs.url = \"github:NixOS/nixpkgs\"; x = nixpkgs.legacyPackages;");
        assert!(names.is_empty());
        assert_eq!(package_names("home.packages = [ pkgs.neovim ];"), vec!["neovim"]);
    }

    #[test]
    fn test_option_paths_known_prefixes_only() {
        let options = option_paths(ANSWER);
        assert_eq!(
            options,
            vec![
                "environment.systemPackages",
                "services.openssh.enable",
                "boot.loader.systemd-boot.enable"
            ]
        );
        assert!(option_paths("foo.bar = 1;").is_empty());
        assert!(option_paths("if services.x.enable == true").is_empty());
    }

    #[test]
    fn test_commands_and_binary() {
        let cmds = commands(ANSWER);
        assert_eq!(cmds, vec!["nixos-rebuild switch", "nix-shell -p htop ripgrep"]);
        assert_eq!(command_binary(&cmds[0]), "nixos-rebuild");
    }

    #[test]
    fn test_prose_nix_is_not_a_command() {
        assert!(commands("nix is only for nixos users").is_empty());
        assert_eq!(commands("run nix flake update now"), vec!["nix flake update now"]);
    }

    #[test]
    fn test_flake_detection() {
        let flake = "```nix\n{\n  description = \"x\";\n  inputs.nixpkgs.url = \"github:NixOS/nixpkgs\";\n  outputs = { self, nixpkgs }: { };\n}\n```";
        assert!(flake_block(flake).is_some());
        assert!(mentions_flake(flake));
    }

    #[test]
    fn test_words() {
        assert_eq!(words("Enable Bluetooth, then (reboot)."), vec!["enable", "bluetooth", "then", "reboot"]);
        assert_eq!(significant_words("use the nix store"), vec!["store"]);
    }
}
