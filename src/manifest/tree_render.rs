//! ASCII outline of a manifest's block tree.

use super::{Block, Branch, Manifest, Node, Statement};

const STATEMENT: char = '•';
const BRANCH: char = '◇';
const FEED: char = '●';

/// Render the block tree as ASCII art.
///
/// Example output:
/// ```text
/// cask example-two
/// ├── ◇ if MacOS.release <= :el_capitan
/// │   ├── • version 1.5.0
/// │   └── ● appcast https://example.com/sparkle/#{version}/el_capitan.xml
/// ├── ◇ else
/// │   └── • version 2.0.0
/// └── • name Example
/// ```
pub fn render_tree(manifest: &Manifest) -> String {
    let mut output = String::new();
    match &manifest.token {
        Some(token) => output.push_str(&format!("cask {}", token)),
        None => output.push_str("(manifest)"),
    }
    output.push('\n');
    render_block(&mut output, &manifest.root, "");
    output
}

fn render_block(output: &mut String, block: &Block, prefix: &str) {
    // Conditionals flatten into their branches at this level.
    let mut entries: Vec<Entry<'_>> = Vec::new();
    for node in &block.nodes {
        match node {
            Node::Statement(s) => entries.push(Entry::Statement(s)),
            Node::Conditional(c) => entries.extend(c.branches.iter().map(Entry::Branch)),
        }
    }

    for (i, entry) in entries.iter().enumerate() {
        let is_last = i == entries.len() - 1;
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        match entry {
            Entry::Statement(s) => {
                output.push(statement_symbol(s));
                output.push(' ');
                output.push_str(&statement_summary(s));
                output.push('\n');
            }
            Entry::Branch(b) => {
                output.push(BRANCH);
                output.push(' ');
                output.push_str(&b.label());
                output.push('\n');
                let continuation = if is_last { "    " } else { "│   " };
                render_block(output, &b.block, &format!("{}{}", prefix, continuation));
            }
        }
    }
}

enum Entry<'a> {
    Statement(&'a Statement),
    Branch(&'a Branch),
}

fn statement_symbol(statement: &Statement) -> char {
    if statement.name == "appcast" {
        FEED
    } else {
        STATEMENT
    }
}

fn statement_summary(statement: &Statement) -> String {
    match statement.positional.first() {
        Some(value) => format!("{} {}", statement.name, value.display()),
        None if statement.has_block => format!("{} do … end", statement.name),
        None => statement.name.clone(),
    }
}
