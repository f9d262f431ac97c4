//! Inspector commands and the CLI entry points that drive them.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use crossterm::ExecutableCommand;
use survey::cache::{self, LoadedSurvey};
use survey::{
    analysis, load_survey, parse_response_query, CommandLine, Config, DisplayConfig, Error,
    LoadOptions, Response, Result, SchemaEntry, SurveyData,
};

use crate::render;

/// Everything resolved from the command line before a survey is loaded.
#[derive(Debug, Clone)]
pub struct Env {
    pub config: Config,
    /// Workbook or dump to load.
    pub source: PathBuf,
    pub options: LoadOptions,
}

impl Env {
    pub fn resolve(
        config_dir: Option<&Path>,
        file: Option<PathBuf>,
        no_cache: bool,
        rebuild_cache: bool,
    ) -> Result<Self> {
        let config = match config_dir {
            Some(dir) => Config::load_from(dir)?,
            None => Config::load()?,
        };
        let source = file.unwrap_or_else(|| config.data_file.clone());

        let mut options = LoadOptions::from(&config);
        if no_cache {
            options.use_cache = false;
        }
        options.rebuild = rebuild_cache;

        Ok(Self {
            config,
            source,
            options,
        })
    }

    pub fn load(&self) -> Result<LoadedSurvey> {
        load_survey(&self.source, &self.options)
    }

    fn require_workbook(&self) -> Result<()> {
        if cache::is_dump(&self.source) {
            return Err(Error::Usage(format!(
                "{} is a JSON dump; only workbooks are cached",
                self.source.display()
            )));
        }
        Ok(())
    }
}

/// Execute a single inspector command line against the loaded survey.
pub fn run_line(env: &Env, line: &str) -> Result<()> {
    let loaded = env.load()?;
    let session = Session::new(loaded.data, env.config.display);
    let commands = CommandSet::standard()?;

    let mut stdout = io::stdout().lock();
    commands.execute(&session, line, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Re-ingest the workbook and rewrite its cache.
pub fn cache_build(env: &Env) -> Result<()> {
    env.require_workbook()?;
    let path = cache::build_cache(&env.source, &env.options)?;
    println!("Wrote cache {}", path.display());
    Ok(())
}

pub fn cache_clear(env: &Env) -> Result<()> {
    env.require_workbook()?;
    if cache::clear_cache(&env.source, &env.options)? {
        println!("Removed cache for {}", env.source.display());
    } else {
        println!("No cache for {}", env.source.display());
    }
    Ok(())
}

pub fn cache_info(env: &Env) -> Result<()> {
    env.require_workbook()?;
    let Some(info) = cache::cache_info(&env.source, &env.options)? else {
        let expected = cache::cache_path(
            &env.source,
            env.options.cache_dir.as_deref(),
            env.options.compress,
        );
        println!("No cache for {} (expected at {})", env.source.display(), expected.display());
        return Ok(());
    };

    let source_state = match info.fresh {
        Some(true) => "up to date",
        Some(false) => "changed since cache was built",
        None => "missing",
    };
    println!("Cache:     {}", info.path.display());
    println!("Size:      {}", format_bytes(info.size_bytes));
    println!("Format:    v{}", info.version);
    println!("Created:   {}", info.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Questions: {}", info.questions);
    println!("Responses: {}", info.responses);
    println!("Source:    {} ({})", env.source.display(), source_state);
    Ok(())
}

/// Load the survey and write it as a plain JSON dump.
pub fn dump(env: &Env, out: &Path) -> Result<()> {
    let loaded = env.load()?;
    cache::write_dump(out, &loaded.data)?;
    println!(
        "Wrote {} questions and {} responses to {}",
        loaded.data.schema.len(),
        loaded.data.responses.len(),
        out.display()
    );
    Ok(())
}

/// Format bytes for display.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

// Inspector commands

/// Whether the shell keeps reading input after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Loaded survey plus display settings, shared by all commands.
pub struct Session {
    pub data: SurveyData,
    pub display: DisplayConfig,
}

impl Session {
    pub fn new(data: SurveyData, display: DisplayConfig) -> Self {
        Self { data, display }
    }
}

/// What a command gets to work with.
pub struct Context<'a> {
    pub session: &'a Session,
    pub commands: &'a CommandSet,
    pub out: &'a mut dyn Write,
}

/// A named inspector command.
pub trait Command {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Argument synopsis shown by `help`.
    fn usage(&self) -> &'static str {
        ""
    }

    /// One-line description shown by `help`.
    fn about(&self) -> &'static str;

    fn run(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<Flow>;
}

/// Commands addressable by name or alias.
#[derive(Default)]
pub struct CommandSet {
    commands: Vec<Box<dyn Command>>,
    lookup: HashMap<&'static str, usize>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full inspector command set.
    pub fn standard() -> Result<Self> {
        let mut set = Self::new();
        set.add(Box::new(ClearCommand))?;
        set.add(Box::new(ListCommand))?;
        set.add(Box::new(SearchCommand))?;
        set.add(Box::new(AnalyzeCommand))?;
        set.add(Box::new(ResponsesCommand))?;
        set.add(Box::new(SubsetCommand))?;
        set.add(Box::new(HelpCommand))?;
        set.add(Box::new(QuitCommand))?;
        Ok(set)
    }

    /// Register a command. Names and aliases must be unique across the set.
    pub fn add(&mut self, command: Box<dyn Command>) -> Result<()> {
        let name = command.name();
        if self.lookup.contains_key(name) {
            return Err(Error::Config(format!("command already exists: {}", name)));
        }
        let aliases = command.aliases();
        for (i, alias) in aliases.iter().enumerate() {
            if self.lookup.contains_key(alias) || *alias == name || aliases[..i].contains(alias) {
                return Err(Error::Config(format!("command alias already exists: {}", alias)));
            }
        }

        let index = self.commands.len();
        self.lookup.insert(name, index);
        for alias in aliases {
            self.lookup.insert(*alias, index);
        }
        self.commands.push(command);
        Ok(())
    }

    /// Find a command by name or alias.
    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.lookup
            .get(name)
            .map(|&index| self.commands[index].as_ref())
    }

    /// Commands in listing order: `clear` first, `quit` last, the rest by name.
    pub fn ordered(&self) -> Vec<&dyn Command> {
        let mut commands: Vec<&dyn Command> = self.commands.iter().map(|c| c.as_ref()).collect();
        commands.sort_by_key(|c| {
            let rank = match c.name() {
                "clear" => 0,
                "quit" => 2,
                _ => 1,
            };
            (rank, c.name())
        });
        commands
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.ordered().into_iter().map(|c| c.name()).collect()
    }

    /// Command names as prose: `'a', 'b', or 'c'`.
    pub fn help(&self) -> String {
        let names: Vec<String> = self.names().iter().map(|n| format!("'{}'", n)).collect();
        match names.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [rest @ .., last] => format!("{}, or {}", rest.join(", "), last),
        }
    }

    /// Tokenize and run one line of input.
    pub fn execute(&self, session: &Session, line: &str, out: &mut dyn Write) -> Result<Flow> {
        let line = CommandLine::parse(line)?;
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        let command = self
            .get(&line.command)
            .ok_or_else(|| Error::UnknownCommand(line.command.clone()))?;
        tracing::debug!(command = command.name(), args = ?line.args, "running command");

        let mut ctx = Context {
            session,
            commands: self,
            out,
        };
        command.run(&mut ctx, &line.args)
    }
}

fn usage(command: &dyn Command) -> Error {
    Error::Usage(format!("usage: {} {}", command.name(), command.usage()))
}

struct ClearCommand;

impl Command for ClearCommand {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["cls"]
    }

    fn about(&self) -> &'static str {
        "Clear the screen"
    }

    fn run(&self, ctx: &mut Context<'_>, _args: &[String]) -> Result<Flow> {
        ctx.out.execute(Clear(ClearType::All))?;
        ctx.out.execute(MoveTo(0, 0))?;
        Ok(Flow::Continue)
    }
}

struct ListCommand;

impl Command for ListCommand {
    fn name(&self) -> &'static str {
        "list"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["ls"]
    }

    fn about(&self) -> &'static str {
        "List all questions in survey order"
    }

    fn run(&self, ctx: &mut Context<'_>, _args: &[String]) -> Result<Flow> {
        let entries: Vec<&SchemaEntry> = ctx.session.data.schema.iter().collect();
        render::questions(ctx.out, "Survey Questions:", &entries)?;
        Ok(Flow::Continue)
    }
}

struct SearchCommand;

impl Command for SearchCommand {
    fn name(&self) -> &'static str {
        "search"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["find", "query"]
    }

    fn usage(&self) -> &'static str {
        "<term>"
    }

    fn about(&self) -> &'static str {
        "Find questions by key, text or option (globs allowed)"
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<Flow> {
        if args.is_empty() {
            return Err(usage(self));
        }
        let term = args.join(" ");
        let entries = ctx.session.data.schema.search(&term);
        let heading = format!("Survey Questions matching: '{}':", term);
        render::questions(ctx.out, &heading, &entries)?;
        if entries.is_empty() {
            writeln!(ctx.out, "No matching questions.")?;
        }
        Ok(Flow::Continue)
    }
}

struct AnalyzeCommand;

impl Command for AnalyzeCommand {
    fn name(&self) -> &'static str {
        "analyze"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["distribution", "dist"]
    }

    fn usage(&self) -> &'static str {
        "<question-key>"
    }

    fn about(&self) -> &'static str {
        "Show how answers to a choice question are distributed"
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<Flow> {
        let [key, ..] = args else {
            return Err(usage(self));
        };
        let dist = analysis::distribution(&ctx.session.data, key)?;
        render::distribution(ctx.out, &dist, &ctx.session.display)?;
        Ok(Flow::Continue)
    }
}

struct ResponsesCommand;

impl Command for ResponsesCommand {
    fn name(&self) -> &'static str {
        "responses"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["resp", "r"]
    }

    fn usage(&self) -> &'static str {
        "[query]"
    }

    fn about(&self) -> &'static str {
        "Dump responses, e.g. responses keys=Age,Country;range=[first..4]"
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<Flow> {
        let query = parse_response_query(&args.join(" "))?;
        let data = &ctx.session.data;
        let all: Vec<&Response> = data.responses.iter().collect();
        let listed = query.limit(&all);
        render::responses(ctx.out, &data.schema, listed, &query.keys, &ctx.session.display)?;
        Ok(Flow::Continue)
    }
}

struct SubsetCommand;

impl Command for SubsetCommand {
    fn name(&self) -> &'static str {
        "subset"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["subsets", "sub"]
    }

    fn usage(&self) -> &'static str {
        "<question-key> <option> [query]"
    }

    fn about(&self) -> &'static str {
        "Dump responses that picked an option; query key * shows all questions"
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<Flow> {
        let [key, option, rest @ ..] = args else {
            return Err(usage(self));
        };
        let query = parse_response_query(&rest.join(" "))?;
        let data = &ctx.session.data;
        let matched = analysis::subset(data, key, option)?;

        let keys: Vec<String> = if query.keys.iter().any(|k| k == render::ALL_KEYS) {
            vec![render::ALL_KEYS.to_string()]
        } else {
            std::iter::once(key.clone()).chain(query.keys.iter().cloned()).collect()
        };
        render::responses(ctx.out, &data.schema, query.limit(&matched), &keys, &ctx.session.display)?;
        Ok(Flow::Continue)
    }
}

struct HelpCommand;

impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["?"]
    }

    fn about(&self) -> &'static str {
        "List commands"
    }

    fn run(&self, ctx: &mut Context<'_>, _args: &[String]) -> Result<Flow> {
        writeln!(ctx.out, "Commands:")?;
        for command in ctx.commands.ordered() {
            let synopsis = format!("{} {}", command.name(), command.usage());
            writeln!(ctx.out, "  {:<40} {}", synopsis.trim_end(), command.about())?;
            if !command.aliases().is_empty() {
                writeln!(ctx.out, "  {:<40} aliases: {}", "", command.aliases().join(", "))?;
            }
        }
        Ok(Flow::Continue)
    }
}

struct QuitCommand;

impl Command for QuitCommand {
    fn name(&self) -> &'static str {
        "quit"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["exit"]
    }

    fn about(&self) -> &'static str {
        "Leave the inspector"
    }

    fn run(&self, ctx: &mut Context<'_>, _args: &[String]) -> Result<Flow> {
        writeln!(ctx.out, "Bye!")?;
        Ok(Flow::Quit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey::ingest::build_survey;

    struct Dummy {
        name: &'static str,
        aliases: &'static [&'static str],
    }

    impl Command for Dummy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn aliases(&self) -> &'static [&'static str] {
            self.aliases
        }

        fn about(&self) -> &'static str {
            "dummy"
        }

        fn run(&self, _ctx: &mut Context<'_>, _args: &[String]) -> Result<Flow> {
            Ok(Flow::Continue)
        }
    }

    fn dummy(name: &'static str, aliases: &'static [&'static str]) -> Box<dyn Command> {
        Box::new(Dummy { name, aliases })
    }

    fn rows(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn session() -> Session {
        let schema = rows(&[
            &["qname", "question", "type"],
            &["RemoteWork", "Where do you work?", "SC"],
            &["Language", "Languages used?", "MC"],
            &["Comment", "Anything else?", "TE"],
        ]);
        let raw = rows(&[
            &["RemoteWork", "Language", "Comment"],
            &["Remote", "Rust;Go", "first"],
            &["In-person", "Rust", ""],
            &["Remote", "NA", "third"],
            &["NA", "Python;Rust", "fourth"],
        ]);
        Session::new(build_survey(&schema, &raw).unwrap(), DisplayConfig::default())
    }

    fn run(line: &str) -> Result<(Flow, String)> {
        colored::control::set_override(false);
        let commands = CommandSet::standard()?;
        let mut out = Vec::new();
        let flow = commands.execute(&session(), line, &mut out)?;
        Ok((flow, String::from_utf8(out).unwrap()))
    }

    fn output(line: &str) -> String {
        run(line).unwrap().1
    }

    #[test]
    fn test_get_by_name_and_alias() {
        let mut set = CommandSet::new();
        set.add(dummy("foo", &["f"])).unwrap();
        set.add(dummy("bar", &["b", "bee"])).unwrap();

        assert_eq!(set.get("foo").unwrap().name(), "foo");
        assert_eq!(set.get("b").unwrap().name(), "bar");
        assert_eq!(set.get("bee").unwrap().name(), "bar");
        assert!(set.get("baz").is_none());
        assert!(CommandSet::new().get("foo").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut set = CommandSet::new();
        set.add(dummy("foo", &[])).unwrap();
        let err = set.add(dummy("foo", &[])).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut set = CommandSet::new();
        set.add(dummy("foo", &["bar"])).unwrap();
        let err = set.add(dummy("baz", &["bar"])).unwrap_err();
        assert!(err.to_string().contains("command alias already exists"));

        // Alias clashing with an existing name, or with its own name
        assert!(set.add(dummy("qux", &["foo"])).is_err());
        assert!(set.add(dummy("zap", &["zap"])).is_err());
        // A failed add leaves the set unchanged
        assert!(set.get("baz").is_none());
        assert!(set.get("qux").is_none());
    }

    #[test]
    fn test_help_order_and_format() {
        let mut set = CommandSet::new();
        set.add(dummy("quit", &[])).unwrap();
        set.add(dummy("foo", &["f"])).unwrap();
        set.add(dummy("clear", &[])).unwrap();
        set.add(dummy("bar", &[])).unwrap();
        assert_eq!(set.names(), ["clear", "bar", "foo", "quit"]);
        assert_eq!(set.help(), "'clear', 'bar', 'foo', or 'quit'");

        let mut single = CommandSet::new();
        single.add(dummy("foo", &[])).unwrap();
        assert_eq!(single.help(), "'foo'");
        assert_eq!(CommandSet::new().help(), "");
    }

    #[test]
    fn test_standard_set() {
        let set = CommandSet::standard().unwrap();
        assert_eq!(
            set.names(),
            ["clear", "analyze", "help", "list", "responses", "search", "subset", "quit"]
        );
        for alias in ["cls", "ls", "find", "query", "dist", "distribution", "r", "resp", "sub", "subsets", "?", "exit"] {
            assert!(set.get(alias).is_some(), "alias {}", alias);
        }
    }

    #[test]
    fn test_blank_line_does_nothing() {
        assert_eq!(run("   ").unwrap(), (Flow::Continue, String::new()));
    }

    #[test]
    fn test_unknown_command() {
        let err = run("frobnicate now").unwrap_err();
        assert!(matches!(err, Error::UnknownCommand(ref c) if c == "frobnicate"));
    }

    #[test]
    fn test_tokenize_error_surfaces() {
        let err = run("search 'open").unwrap_err();
        assert!(matches!(err, Error::Tokenize(_)));
    }

    #[test]
    fn test_quit() {
        for line in ["quit", "exit"] {
            assert_eq!(run(line).unwrap(), (Flow::Quit, "Bye!\n".to_string()));
        }
    }

    #[test]
    fn test_list() {
        let text = output("ls");
        assert!(text.starts_with("Survey Questions:\n1. [RemoteWork] (SC)\n    Where do you work?\n"));
        assert!(text.contains("3. [Comment] (TE)\n    Anything else?\n"));
        assert!(text.contains("    Used options:\n        - Go\n        - Python\n        - Rust\n"));
    }

    #[test]
    fn test_search() {
        let text = output("search where do");
        assert!(text.starts_with("Survey Questions matching: 'where do':\n1. [RemoteWork] (SC)"));
        assert!(!text.contains("Language"));

        assert!(output("find 'zzz'").contains("No matching questions."));
        assert!(matches!(run("search"), Err(Error::Usage(_))));
    }

    #[test]
    fn test_analyze() {
        let text = output("dist RemoteWork");
        assert!(text.starts_with("Distribution for RemoteWork: Where do you work?\n"));
        assert!(text.contains("  Remote    :       2  ( 50.00%) ████████\n"));
        assert!(text.contains("  (missing) :       1  ( 25.00%)\n"));

        assert!(matches!(run("analyze"), Err(Error::Usage(_))));
        assert!(matches!(run("analyze Comment"), Err(Error::Usage(_))));
        assert!(matches!(run("analyze Nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_responses_with_query() {
        let text = output("responses keys=Comment;range=[first+1..last-1]");
        assert_eq!(text, "Response 1:\n    Comment: n/a\nResponse 2:\n    Comment: third\n");

        // Query words are joined back together
        let text = output("r keys: Comment, RemoteWork ; range: [last..last]");
        assert_eq!(text, "Response 1:\n    Comment: fourth\n    RemoteWork: n/a\n");

        let text = output("resp");
        assert_eq!(text.matches("Response ").count(), 4);
        assert!(text.contains("    Language: Rust, Go\n"));

        assert!(matches!(run("responses range=[x..y]"), Err(Error::Query(_))));
    }

    #[test]
    fn test_quoted_query_keys_need_outer_quotes() {
        // The command line strips one level of quotes before the query sees it
        let text = output("responses keys:'Remote,Work';range=[0..0]");
        assert_eq!(text, "Response 1:\n    Remote: n/a\n    Work: n/a\n");

        let text = output(r#"responses "keys:'Remote,Work', Comment;range=[0..0]""#);
        assert_eq!(text, "Response 1:\n    Remote,Work: n/a\n    Comment: first\n");

        let text = output(r#"subset Language go "keys:'it''s, here'""#);
        assert_eq!(text, "Response 1:\n    Language: Rust, Go\n    it's, here: n/a\n");
    }

    #[test]
    fn test_subset() {
        let text = output("subset Language rust");
        assert_eq!(text.matches("Response ").count(), 3);
        assert!(text.starts_with("Response 1:\n    Language: Rust, Go\n"));
        assert!(!text.contains("Comment"));

        let text = output("sub Language rust keys=Comment;range=[last..last]");
        assert_eq!(text, "Response 1:\n    Language: Python, Rust\n    Comment: fourth\n");

        let text = output("subsets RemoteWork REMOTE keys=*");
        assert_eq!(text.matches("Response ").count(), 2);
        assert!(text.contains("    Comment: third\n"));

        assert!(matches!(run("subset Language"), Err(Error::Usage(_))));
        assert!(matches!(run("subset Comment x"), Err(Error::Usage(_))));
    }

    #[test]
    fn test_help_lists_commands() {
        let text = output("?");
        assert!(text.starts_with("Commands:\n  clear"));
        assert!(text.contains("subset <question-key> <option> [query]"));
        assert!(text.contains("aliases: distribution, dist"));
        assert!(text.trim_end().lines().rev().nth(1).unwrap().contains("quit"));
    }

    #[test]
    fn test_clear_writes_escape_sequence() {
        let text = output("cls");
        assert!(text.contains("\x1b[2J"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
