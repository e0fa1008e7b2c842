//! Wiki subcommand handlers.
//!
//! # Responsibility
//! - Map parsed arguments onto `WikiService` calls.
//! - Format results for the terminal; warnings go to the error stream.
//!
//! # Invariants
//! - Handlers never print partial results for a failed mutation.
//! - Delete asks for confirmation unless forced.

use crate::args::{
    DeleteArgs, EditArgs, ListArgs, NewArgs, RenameArgs, SearchArgs, ViewArgs, WikiCommand,
};
use log::info;
use notewiki_core::{
    ConfigError, Editor, MatchField, NewNote, NoteEdit, NoteRepository, NoteView, SearchQuery,
    WikiError, WikiService,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};

/// Failure surfaced to the user with a non-zero exit code.
#[derive(Debug)]
pub enum CommandError {
    Config(ConfigError),
    Wiki(WikiError),
    Io(io::Error),
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Wiki(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "terminal i/o failed: {err}"),
        }
    }
}

impl Error for CommandError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Wiki(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for CommandError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<WikiError> for CommandError {
    fn from(value: WikiError) -> Self {
        Self::Wiki(value)
    }
}

impl From<notewiki_core::RepoError> for CommandError {
    fn from(value: notewiki_core::RepoError) -> Self {
        Self::Wiki(value.into())
    }
}

impl From<io::Error> for CommandError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Terminal collaborators for one invocation.
pub struct Session<'a> {
    pub editor: &'a dyn Editor,
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
    /// Asks a yes/no question; `true` means proceed.
    pub confirm: &'a mut dyn FnMut(&str) -> io::Result<bool>,
}

/// Runs one wiki subcommand.
pub fn run<R: NoteRepository>(
    command: WikiCommand,
    wiki: &mut WikiService<R>,
    session: &mut Session<'_>,
) -> Result<(), CommandError> {
    match command {
        WikiCommand::New(args) => new(args, wiki, session),
        WikiCommand::View(args) => view(args, wiki, session),
        WikiCommand::Edit(args) => edit(args, wiki, session),
        WikiCommand::Delete(args) => delete(args, wiki, session),
        WikiCommand::List(args) => list(args, wiki, session),
        WikiCommand::Search(args) => search(args, wiki, session),
        WikiCommand::Rename(args) => rename(args, wiki, session),
        WikiCommand::Check => check(wiki, session),
        WikiCommand::Reindex => reindex(wiki, session),
    }
}

fn new<R: NoteRepository>(
    args: NewArgs,
    wiki: &mut WikiService<R>,
    session: &mut Session<'_>,
) -> Result<(), CommandError> {
    let open_editor = args.body.is_none() && !args.no_edit;
    let created = wiki.create_note(NewNote {
        title: args.title,
        tags: args.tags,
        aliases: args.aliases,
        body: args.body,
    })?;
    let slug = created.note.slug.clone();
    writeln!(session.out, "Created {} ({slug})", created.note.title)?;

    if open_editor {
        let edited = wiki.edit_with_editor_by_slug(&slug, session.editor)?;
        write_warnings(session, &edited)?;
    }
    Ok(())
}

fn view<R: NoteRepository>(
    args: ViewArgs,
    wiki: &mut WikiService<R>,
    session: &mut Session<'_>,
) -> Result<(), CommandError> {
    let view = wiki.view_note(&args.target)?;
    let note = &view.note;
    writeln!(session.out, "{} ({})", note.title, note.slug)?;
    if !note.aliases.is_empty() {
        writeln!(session.out, "Aliases: {}", note.aliases.join(", "))?;
    }
    if !note.tags.is_empty() {
        let tags = note.tags.iter().map(String::as_str).collect::<Vec<_>>();
        writeln!(session.out, "Tags: {}", tags.join(", "))?;
    }
    writeln!(session.out)?;
    writeln!(session.out, "{}", note.body.trim_end())?;
    writeln!(session.out)?;

    if view.backlinks.is_empty() {
        writeln!(session.out, "Backlinks: none")?;
    } else {
        writeln!(session.out, "Backlinks:")?;
        for linked in &view.backlinks {
            writeln!(session.out, "- {} ({})", linked.title, linked.slug)?;
        }
    }

    let unresolved = view.unresolved().collect::<Vec<_>>();
    if !unresolved.is_empty() {
        writeln!(session.out, "Unresolved links:")?;
        for link in unresolved {
            writeln!(session.out, "- [[{}]]", link.reference.target)?;
        }
    }

    if args.graph {
        writeln!(session.out)?;
        writeln!(
            session.out,
            "{}",
            wiki.render_graph_for_slug(&note.slug, args.depth)?
        )?;
    }
    write_warnings(session, &view)
}

fn edit<R: NoteRepository>(
    args: EditArgs,
    wiki: &mut WikiService<R>,
    session: &mut Session<'_>,
) -> Result<(), CommandError> {
    let changes = NoteEdit {
        title: args.title,
        tags: (!args.tags.is_empty()).then_some(args.tags),
        aliases: (!args.aliases.is_empty()).then_some(args.aliases),
        body: args.body,
    };
    let updated = if changes.is_empty() {
        wiki.edit_with_editor(&args.target, session.editor)?
    } else {
        wiki.edit_note(&args.target, changes)?
    };
    writeln!(
        session.out,
        "Updated {} ({})",
        updated.note.title, updated.note.slug
    )?;
    write_warnings(session, &updated)
}

fn delete<R: NoteRepository>(
    args: DeleteArgs,
    wiki: &mut WikiService<R>,
    session: &mut Session<'_>,
) -> Result<(), CommandError> {
    let found = wiki.view_note(&args.target)?;
    if let Some(ambiguity) = &found.lookup_ambiguity {
        writeln!(session.err, "warning: {ambiguity}")?;
    }
    let target = found.note;
    if !args.force {
        let question = format!("Delete note '{}' ({})?", target.title, target.slug);
        if !(session.confirm)(&question)? {
            info!("event=note_delete module=cli status=aborted slug={}", target.slug);
            writeln!(session.out, "Aborted.")?;
            return Ok(());
        }
    }

    let outcome = wiki.delete_by_slug(&target.slug)?;
    writeln!(
        session.out,
        "Deleted {} ({})",
        outcome.note.title, outcome.note.slug
    )?;
    if !outcome.dangling_sources.is_empty() {
        writeln!(
            session.err,
            "warning: still referenced by {}",
            outcome.dangling_sources.join(", ")
        )?;
    }
    Ok(())
}

fn list<R: NoteRepository>(
    args: ListArgs,
    wiki: &mut WikiService<R>,
    session: &mut Session<'_>,
) -> Result<(), CommandError> {
    let notes = wiki.list_notes(args.tag.as_deref());
    if notes.is_empty() {
        writeln!(session.out, "No wiki notes found.")?;
        return Ok(());
    }
    for note in &notes {
        if note.tags.is_empty() {
            writeln!(session.out, "{} ({})", note.title, note.slug)?;
        } else {
            let tags = note.tags.iter().map(String::as_str).collect::<Vec<_>>();
            writeln!(
                session.out,
                "{} ({}) [{}]",
                note.title,
                note.slug,
                tags.join(", ")
            )?;
        }
    }
    writeln!(session.out, "{} note(s)", notes.len())?;
    Ok(())
}

fn search<R: NoteRepository>(
    args: SearchArgs,
    wiki: &mut WikiService<R>,
    session: &mut Session<'_>,
) -> Result<(), CommandError> {
    let query = SearchQuery {
        text: args.query,
        tag: args.tag,
        limit: args.limit,
    };
    let hits = wiki.search(&query);
    if hits.is_empty() {
        writeln!(session.out, "No notes match \"{}\".", query.text)?;
        return Ok(());
    }
    if args.graph {
        for (position, hit) in hits.iter().enumerate() {
            if position > 0 {
                writeln!(session.out)?;
            }
            writeln!(
                session.out,
                "{}",
                wiki.render_graph_for_slug(&hit.note.slug, args.depth)?
            )?;
        }
        return Ok(());
    }
    for hit in hits {
        let field = match hit.field {
            MatchField::Title => "title",
            MatchField::Alias => "alias",
            MatchField::Tag => "tag",
            MatchField::Body => "body",
        };
        writeln!(
            session.out,
            "{} ({}) matched {field}",
            hit.note.title, hit.note.slug
        )?;
    }
    Ok(())
}

fn rename<R: NoteRepository>(
    args: RenameArgs,
    wiki: &mut WikiService<R>,
    session: &mut Session<'_>,
) -> Result<(), CommandError> {
    let outcome = wiki.rename_note(&args.target, &args.new_title, args.update_slug)?;
    let note = &outcome.view.note;
    if note.slug == outcome.previous_slug {
        writeln!(session.out, "Renamed {} to {}", note.slug, note.title)?;
    } else {
        writeln!(
            session.out,
            "Renamed {} to {} ({})",
            outcome.previous_slug, note.title, note.slug
        )?;
    }
    write_warnings(session, &outcome.view)?;
    for broken in &outcome.broken_references {
        writeln!(
            session.err,
            "warning: [[{}]] in {} no longer resolves",
            broken.target, broken.source
        )?;
    }
    Ok(())
}

fn check<R: NoteRepository>(
    wiki: &mut WikiService<R>,
    session: &mut Session<'_>,
) -> Result<(), CommandError> {
    let report = wiki.check();
    if report.is_clean() {
        writeln!(
            session.out,
            "{} note(s), {} link(s), no problems found.",
            wiki.notes().len(),
            wiki.index().edge_count()
        )?;
        return Ok(());
    }
    for reference in &report.unresolved {
        writeln!(
            session.out,
            "unresolved: [[{}]] in {}",
            reference.target, reference.source
        )?;
    }
    for reference in &report.ambiguous {
        writeln!(
            session.out,
            "ambiguous: {} (in {})",
            reference.ambiguity, reference.source
        )?;
    }
    for conflict in &report.alias_conflicts {
        writeln!(session.out, "conflict: {conflict}")?;
    }
    Ok(())
}

fn reindex<R: NoteRepository>(
    wiki: &mut WikiService<R>,
    session: &mut Session<'_>,
) -> Result<(), CommandError> {
    let written = wiki.reindex()?;
    writeln!(
        session.out,
        "Indexed {} note(s); rewrote {written} file(s).",
        wiki.notes().len()
    )?;
    Ok(())
}

fn write_warnings(session: &mut Session<'_>, view: &NoteView) -> Result<(), CommandError> {
    for warning in view.warnings() {
        writeln!(session.err, "warning: {warning}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run, Session};
    use crate::args::{Cli, Commands, WikiCommand};
    use clap::Parser;
    use notewiki_core::{Editor, EditorError, MemoryNoteRepository, WikiService};
    use std::io;
    use std::path::Path;

    struct AppendEditor;

    impl Editor for AppendEditor {
        fn open(&self, path: &Path) -> Result<(), EditorError> {
            let mut content = std::fs::read_to_string(path).unwrap();
            content.push_str("Edited with [[API]].\n");
            std::fs::write(path, content).unwrap();
            Ok(())
        }
    }

    struct Outcome {
        out: String,
        err: String,
        asked: Vec<String>,
    }

    fn wiki_command(argv: &[&str]) -> WikiCommand {
        let mut full = vec!["notewiki", "wiki"];
        full.extend_from_slice(argv);
        let Commands::Wiki(command) = Cli::try_parse_from(full).unwrap().command;
        command
    }

    fn exec(
        wiki: &mut WikiService<MemoryNoteRepository>,
        argv: &[&str],
        answer: bool,
    ) -> Result<Outcome, super::CommandError> {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut asked = Vec::new();
        let mut confirm = |question: &str| -> io::Result<bool> {
            asked.push(question.to_string());
            Ok(answer)
        };
        let mut session = Session {
            editor: &AppendEditor,
            out: &mut out,
            err: &mut err,
            confirm: &mut confirm,
        };
        run(wiki_command(argv), wiki, &mut session)?;
        Ok(Outcome {
            out: String::from_utf8(out).unwrap(),
            err: String::from_utf8(err).unwrap(),
            asked,
        })
    }

    fn wiki() -> WikiService<MemoryNoteRepository> {
        WikiService::open(MemoryNoteRepository::new()).unwrap()
    }

    #[test]
    fn new_then_view_shows_backlinks() {
        let mut wiki = wiki();
        exec(&mut wiki, &["new", "API", "--alias", "api-design", "--no-edit"], true).unwrap();
        exec(&mut wiki, &["new", "Client", "--body", "uses [[api-design]]"], true).unwrap();

        let view = exec(&mut wiki, &["view", "api"], true).unwrap();
        assert!(view.out.starts_with("API (api)\nAliases: api-design\n"));
        assert!(view.out.contains("Backlinks:\n- Client (client)\n"));

        let graph = exec(&mut wiki, &["view", "API", "--graph"], true).unwrap();
        assert!(graph.out.ends_with("API\n└── Client\n"));
    }

    #[test]
    fn new_without_body_opens_editor() {
        let mut wiki = wiki();
        exec(&mut wiki, &["new", "API", "--no-edit"], true).unwrap();
        let created = exec(&mut wiki, &["new", "Client"], true).unwrap();
        assert_eq!(created.out, "Created Client (client)\n");

        let client = wiki.view_note("client").unwrap();
        assert!(client.note.body.starts_with("# Client\n"));
        assert!(client.note.body.ends_with("Edited with [[API]].\n"));
        assert_eq!(wiki.view_note("api").unwrap().backlinks.len(), 1);
    }

    #[test]
    fn duplicate_title_is_an_error() {
        let mut wiki = wiki();
        exec(&mut wiki, &["new", "Overview", "--no-edit"], true).unwrap();
        let err = exec(&mut wiki, &["new", "Overview", "--no-edit"], true)
            .err()
            .unwrap();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn delete_asks_unless_forced() {
        let mut wiki = wiki();
        exec(&mut wiki, &["new", "Target", "--body", "x"], true).unwrap();
        exec(&mut wiki, &["new", "Source", "--body", "[[Target]]"], true).unwrap();

        let declined = exec(&mut wiki, &["delete", "Target"], false).unwrap();
        assert_eq!(declined.asked, vec!["Delete note 'Target' (target)?"]);
        assert_eq!(declined.out, "Aborted.\n");
        assert!(wiki.view_note("target").is_ok());

        let forced = exec(&mut wiki, &["delete", "Target", "--force"], false).unwrap();
        assert!(forced.asked.is_empty());
        assert_eq!(forced.out, "Deleted Target (target)\n");
        assert_eq!(forced.err, "warning: still referenced by source\n");
        assert!(wiki.view_note("target").is_err());
    }

    #[test]
    fn delete_and_graph_keep_the_note_they_looked_up() {
        let mut wiki = wiki();
        exec(&mut wiki, &["new", "Beta", "--alias", "zed", "--no-edit"], true).unwrap();
        exec(&mut wiki, &["new", "Zed", "--no-edit"], true).unwrap();
        exec(&mut wiki, &["new", "Src", "--body", "[[Zed]]"], true).unwrap();

        let graph = exec(&mut wiki, &["view", "Zed", "--graph"], true).unwrap();
        assert!(graph.out.starts_with("Zed (zed)\n"));
        assert!(graph.out.ends_with("Zed\n└── Src\n"));

        let deleted = exec(&mut wiki, &["delete", "Zed", "--force"], true).unwrap();
        assert_eq!(deleted.out, "Deleted Zed (zed)\n");
        assert!(wiki.view_note("beta").is_ok());
        assert_eq!(wiki.view_note("Zed").unwrap().note.slug, "beta");
    }

    #[test]
    fn ambiguous_delete_warns_before_asking() {
        let mut wiki = wiki();
        exec(&mut wiki, &["new", "One", "--body", "x"], true).unwrap();
        exec(&mut wiki, &["new", "Two", "--body", "y"], true).unwrap();
        exec(&mut wiki, &["edit", "two", "--title", "One"], true).unwrap();

        let declined = exec(&mut wiki, &["delete", "One"], false).unwrap();
        assert!(declined.err.starts_with("warning: ambiguous reference `One`"));
        assert!(declined.err.contains("using `one`"));
        assert_eq!(declined.asked, vec!["Delete note 'One' (one)?"]);
        assert_eq!(declined.out, "Aborted.\n");
    }

    #[test]
    fn edit_flags_bypass_the_editor() {
        let mut wiki = wiki();
        exec(&mut wiki, &["new", "Note", "--body", "old"], true).unwrap();
        let edited = exec(&mut wiki, &["edit", "note", "--body", "new", "-t", "x"], true).unwrap();
        assert_eq!(edited.out, "Updated Note (note)\n");
        let note = wiki.view_note("note").unwrap().note;
        assert_eq!(note.body, "new");
        assert!(note.tags.contains("x"));
    }

    #[test]
    fn list_search_and_check_output() {
        let mut wiki = wiki();
        let empty = exec(&mut wiki, &["list"], true).unwrap();
        assert_eq!(empty.out, "No wiki notes found.\n");

        exec(&mut wiki, &["new", "beta", "--body", "see [[Ghost]]", "-t", "x"], true).unwrap();
        exec(&mut wiki, &["new", "Alpha", "--body", "plain"], true).unwrap();

        let listed = exec(&mut wiki, &["list"], true).unwrap();
        assert_eq!(listed.out, "Alpha (alpha)\nbeta (beta) [x]\n2 note(s)\n");

        let found = exec(&mut wiki, &["search", "GHOST"], true).unwrap();
        assert_eq!(found.out, "beta (beta) matched body\n");
        let drawn = exec(&mut wiki, &["search", "a", "--graph"], true).unwrap();
        assert_eq!(
            drawn.out,
            "Alpha\n  (no backlinks)\n\nbeta\n  (no backlinks)\n"
        );
        let missing = exec(&mut wiki, &["search", "zzz"], true).unwrap();
        assert_eq!(missing.out, "No notes match \"zzz\".\n");

        let checked = exec(&mut wiki, &["check"], true).unwrap();
        assert_eq!(checked.out, "unresolved: [[Ghost]] in beta\n");
    }

    #[test]
    fn rename_reports_broken_references() {
        let mut wiki = wiki();
        exec(&mut wiki, &["new", "Old", "--body", "x"], true).unwrap();
        exec(&mut wiki, &["new", "Linker", "--body", "[[Old]]"], true).unwrap();

        let renamed = exec(&mut wiki, &["rename", "Old", "Fresh", "--update-slug"], true).unwrap();
        assert_eq!(renamed.out, "Renamed old to Fresh (fresh)\n");
        assert_eq!(renamed.err, "warning: [[Old]] in linker no longer resolves\n");
    }
}
