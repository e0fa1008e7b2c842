//! Command-line surface.

use clap::{Args, Parser, Subcommand};
use notewiki_core::config::HOME_ENV;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "notewiki", version, about = "Personal wiki notes with backlinks")]
pub struct Cli {
    #[arg(long, global = true, env = HOME_ENV, help = "Data directory (default: ~/.notewiki)")]
    pub data: Option<PathBuf>,

    #[arg(long, global = true, help = "Log level: trace|debug|info|warn|error")]
    pub log_level: Option<String>,

    #[arg(long, global = true, help = "Editor command (default: $EDITOR, then vi)")]
    pub editor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(subcommand, about = "Create, browse and maintain wiki notes")]
    Wiki(WikiCommand),
}

#[derive(Debug, Subcommand)]
pub enum WikiCommand {
    #[command(about = "Create a note")]
    New(NewArgs),

    #[command(about = "Show a note with its backlinks")]
    View(ViewArgs),

    #[command(about = "Edit a note in place or in $EDITOR")]
    Edit(EditArgs),

    #[command(about = "Delete a note")]
    Delete(DeleteArgs),

    #[command(about = "List notes")]
    List(ListArgs),

    #[command(about = "Search titles, aliases, tags and bodies")]
    Search(SearchArgs),

    #[command(about = "Change a note's title")]
    Rename(RenameArgs),

    #[command(about = "Report unresolved links, ambiguities and alias conflicts")]
    Check,

    #[command(about = "Rewrite stale backlink caches in note files")]
    Reindex,
}

#[derive(Debug, Args)]
pub struct NewArgs {
    #[arg(help = "Note title")]
    pub title: String,

    #[arg(short, long = "tag", help = "Tag (repeatable)")]
    pub tags: Vec<String>,

    #[arg(short, long = "alias", help = "Alias (repeatable)")]
    pub aliases: Vec<String>,

    #[arg(long, help = "Body text; skips the editor")]
    pub body: Option<String>,

    #[arg(long, help = "Do not open the editor after creating")]
    pub no_edit: bool,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    #[arg(help = "Title, alias or slug")]
    pub target: String,

    #[arg(long, help = "Also draw the backlink tree")]
    pub graph: bool,

    #[arg(long, requires = "graph", help = "Maximum tree depth")]
    pub depth: Option<usize>,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    #[arg(help = "Title, alias or slug")]
    pub target: String,

    #[arg(long, help = "New title (slug stays the same)")]
    pub title: Option<String>,

    #[arg(short, long = "tag", help = "Replace tags (repeatable)")]
    pub tags: Vec<String>,

    #[arg(short, long = "alias", help = "Replace aliases (repeatable)")]
    pub aliases: Vec<String>,

    #[arg(long, help = "Replace the body")]
    pub body: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[arg(help = "Title, alias or slug")]
    pub target: String,

    #[arg(short, long, help = "Skip the confirmation prompt")]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(short, long, help = "Only notes with this tag")]
    pub tag: Option<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(help = "Case-insensitive substring")]
    pub query: String,

    #[arg(short, long, help = "Only notes with this tag")]
    pub tag: Option<String>,

    #[arg(long, help = "Maximum number of results")]
    pub limit: Option<usize>,

    #[arg(long, help = "Draw the backlink tree of each result")]
    pub graph: bool,

    #[arg(long, requires = "graph", help = "Maximum tree depth")]
    pub depth: Option<usize>,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    #[arg(help = "Title, alias or slug")]
    pub target: String,

    #[arg(help = "New title")]
    pub new_title: String,

    #[arg(long, help = "Move the note to the slug of the new title")]
    pub update_slug: bool,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, WikiCommand};
    use clap::Parser;

    #[test]
    fn parses_new_with_repeated_flags() {
        let cli = Cli::try_parse_from([
            "notewiki", "wiki", "new", "API", "-t", "backend", "--tag", "net", "--alias",
            "api-design", "--no-edit",
        ])
        .unwrap();
        let Commands::Wiki(WikiCommand::New(args)) = cli.command else {
            panic!("expected wiki new");
        };
        assert_eq!(args.title, "API");
        assert_eq!(args.tags, vec!["backend", "net"]);
        assert_eq!(args.aliases, vec!["api-design"]);
        assert!(args.no_edit);
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "notewiki", "wiki", "list", "--data", "/tmp/wiki", "--log-level", "warn",
        ])
        .unwrap();
        assert_eq!(cli.data.unwrap().to_str(), Some("/tmp/wiki"));
        assert_eq!(cli.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn depth_requires_graph() {
        assert!(Cli::try_parse_from(["notewiki", "wiki", "view", "API", "--depth", "2"]).is_err());
        assert!(
            Cli::try_parse_from(["notewiki", "wiki", "view", "API", "--graph", "--depth", "2"])
                .is_ok()
        );
        assert!(Cli::try_parse_from(["notewiki", "wiki", "search", "x", "--depth", "1"]).is_err());
        let cli = Cli::try_parse_from([
            "notewiki", "wiki", "search", "x", "--graph", "--depth", "1",
        ])
        .unwrap();
        let Commands::Wiki(WikiCommand::Search(args)) = cli.command else {
            panic!("expected wiki search");
        };
        assert!(args.graph);
        assert_eq!(args.depth, Some(1));
    }
}
