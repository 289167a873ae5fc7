//! Interactive terminal front end: reads commands, drives the session,
//! and re-renders the current page after every change.

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::debug;

use crate::models::user::{LoginData, ProfileUpdate, SignupData};
use crate::routes::{resolve, Navigation, Route};
use crate::session::ApplyOutcome;
use crate::views::ViewContext;

const HELP: &str = "\
Commands:
  go <path>            open a page (/, /login, /signup, /companies, /companies/<handle>, /jobs, /profile)
  search <term>        filter the current list (search with no term clears it)
  login <user> <pass>
  signup <user> <pass> <first> <last> <email>
  logout
  apply <job id>
  profile key=value..  keys: firstName lastName email password
  help
  quit";

const COMMANDS: &[&str] = &[
    "go", "search", "login", "signup", "logout", "apply", "profile", "help", "quit",
];

const PATHS: &[&str] = &["/", "/login", "/signup", "/companies", "/jobs", "/profile"];

/// Tab completion for command names, and for page paths after `go`.
struct ShellHelper;

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = completions(&line[..pos]);
        let candidates = words
            .into_iter()
            .map(|w| Pair {
                display: w.to_string(),
                replacement: w.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

/// Returns where the word under the cursor starts and what it may become.
fn completions(line: &str) -> (usize, Vec<&'static str>) {
    let start = line.rfind(char::is_whitespace).map_or(0, |i| i + 1);
    let word = &line[start..];
    let head = line[..start].trim();
    let pool: &[&str] = match head {
        "" if word.starts_with('/') => PATHS,
        "" => COMMANDS,
        "go" => PATHS,
        _ => &[],
    };
    (
        start,
        pool.iter().copied().filter(|c| c.starts_with(word)).collect(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Go(String),
    Search(Option<String>),
    Login(String, String),
    Signup {
        username: String,
        password: String,
        first_name: String,
        last_name: String,
        email: String,
    },
    Logout,
    Apply(i64),
    Profile(Vec<(String, String)>),
    Help,
    Quit,
}

/// Parses one input line. `Err` carries a usage message.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, rest)) = words.split_first() else {
        return Err("Type `help` for commands.".to_string());
    };

    if head.starts_with('/') && rest.is_empty() {
        return Ok(Command::Go(head.to_string()));
    }

    match (head, rest) {
        ("go", [path]) => Ok(Command::Go(path.to_string())),
        ("search", []) => Ok(Command::Search(None)),
        ("search", terms) => Ok(Command::Search(Some(terms.join(" ")))),
        ("login", [user, pass]) => Ok(Command::Login(user.to_string(), pass.to_string())),
        ("signup", [user, pass, first, last, email]) => Ok(Command::Signup {
            username: user.to_string(),
            password: pass.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
        }),
        ("logout", []) => Ok(Command::Logout),
        ("apply", [id]) => id
            .parse()
            .map(Command::Apply)
            .map_err(|_| format!("Not a job id: {id}")),
        ("profile", pairs) if !pairs.is_empty() => pairs
            .iter()
            .map(|pair| {
                pair.split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| format!("Expected key=value, got {pair}"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Command::Profile),
        ("help", _) => Ok(Command::Help),
        ("quit" | "exit", _) => Ok(Command::Quit),
        _ => Err(format!("Unrecognized command: {line}\n{HELP}")),
    }
}

fn profile_update(pairs: &[(String, String)]) -> Result<ProfileUpdate, String> {
    let mut update = ProfileUpdate::default();
    for (key, value) in pairs {
        let slot = match key.as_str() {
            "firstName" => &mut update.first_name,
            "lastName" => &mut update.last_name,
            "email" => &mut update.email,
            "password" => &mut update.password,
            other => return Err(format!("Unknown profile field: {other}")),
        };
        *slot = Some(value.clone());
    }
    Ok(update)
}

/// Page state owned by the shell: where the user is and what they searched for.
pub struct Shell {
    ctx: ViewContext,
    current: Route,
    filter: Option<String>,
}

impl Shell {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            current: Route::Home,
            filter: None,
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> &Route {
        &self.current
    }

    /// Resolves `path` against the session, following a redirect if any.
    fn navigate(&mut self, path: &str) -> Option<String> {
        let session = self.ctx.session.snapshot();
        let (route, notice) = match resolve(path, &session) {
            Navigation::Render(route) => (route, None),
            Navigation::Redirect(route) => {
                debug!("Redirecting {path} to {route}");
                let notice = format!("{path} is not available, showing {route}");
                (route, Some(notice))
            }
        };
        if route != self.current {
            self.filter = None;
        }
        self.current = route;
        notice
    }

    /// Runs one command and returns the text to print, or `None` to quit.
    pub async fn handle(&mut self, command: Command) -> Option<String> {
        let notice = match command {
            Command::Quit => return None,
            Command::Help => return Some(HELP.to_string()),
            Command::Go(path) => self.navigate(&path),
            Command::Search(term) => {
                if matches!(self.current, Route::Companies | Route::Jobs) {
                    self.filter = term;
                    None
                } else {
                    Some("Search works on /companies and /jobs.".to_string())
                }
            }
            Command::Login(username, password) => {
                let result = self.ctx.session.login(LoginData { username, password }).await;
                if result.success {
                    self.navigate("/companies")
                } else {
                    Some(format!("Login failed: {}", result.errors.join("; ")))
                }
            }
            Command::Signup {
                username,
                password,
                first_name,
                last_name,
                email,
            } => {
                let data = SignupData {
                    username,
                    password,
                    first_name,
                    last_name,
                    email,
                };
                let result = self.ctx.session.signup(data).await;
                if result.success {
                    self.navigate("/companies")
                } else {
                    Some(format!("Signup failed: {}", result.errors.join("; ")))
                }
            }
            Command::Logout => {
                self.ctx.session.logout();
                self.navigate("/")
            }
            Command::Apply(job_id) => match self.ctx.session.apply_to_job(job_id).await {
                Ok(ApplyOutcome::Applied) => Some(format!("Applied to job {job_id}.")),
                Ok(ApplyOutcome::AlreadyApplied) => {
                    Some(format!("Already applied to job {job_id}."))
                }
                Err(e) => Some(e.to_string()),
            },
            Command::Profile(pairs) => match profile_update(&pairs) {
                Ok(update) if update.is_empty() => Some("Nothing to update.".to_string()),
                Ok(update) => {
                    let result = self.ctx.session.save_profile(update).await;
                    if result.success {
                        Some("Updated successfully.".to_string())
                    } else {
                        Some(format!("Update failed: {}", result.errors.join("; ")))
                    }
                }
                Err(msg) => Some(msg),
            },
        };

        // Re-check the guard: a logout or failed reload may have revoked access.
        let path = self.current.path();
        let guard_notice = self.navigate(&path);

        let page = self.ctx.render(&self.current, self.filter.as_deref()).await;
        let notices: Vec<String> = [notice, guard_notice].into_iter().flatten().collect();
        Some(if notices.is_empty() {
            page
        } else {
            format!("{}\n\n{}", notices.join("\n"), page)
        })
    }

    /// Reads commands from the terminal until `quit` or end of input.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::new()?;
        rl.set_helper(Some(ShellHelper));

        println!("{}", self.ctx.render(&self.current, None).await);

        loop {
            // The editor owns the terminal while it waits for a line.
            let line = match tokio::task::block_in_place(|| rl.readline("> ")) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("(Ctrl-C) Type `quit` to exit.");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            if line.trim().is_empty() {
                continue;
            }
            let _ = rl.add_history_entry(line.as_str());

            let output = match parse_command(&line) {
                Ok(command) => match self.handle(command).await {
                    Some(output) => output,
                    None => break,
                },
                Err(usage) => usage,
            };
            println!("{output}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::api::mock::MockBackend;
    use crate::session::SessionController;
    use crate::token::MemoryTokenStore;

    fn shell() -> Shell {
        let api = Arc::new(MockBackend::with_user("alice", "secret", &[3]));
        let session = SessionController::new(api.clone(), Arc::new(MemoryTokenStore::default()));
        Shell::new(ViewContext::new(session, api))
    }

    #[test]
    fn test_completes_command_names() {
        assert_eq!(completions("lo"), (0, vec!["login", "logout"]));
        assert_eq!(completions("s"), (0, vec!["search", "signup"]));
        assert_eq!(completions("zz"), (0, vec![]));
    }

    #[test]
    fn test_completes_paths_after_go() {
        assert_eq!(completions("go /c"), (3, vec!["/companies"]));
        assert_eq!(completions("/pro"), (0, vec!["/profile"]));
        assert_eq!(completions("apply 4"), (6, vec![]));
    }

    #[test]
    fn test_parse_navigation() {
        assert_eq!(parse_command("go /jobs"), Ok(Command::Go("/jobs".into())));
        assert_eq!(parse_command("/profile"), Ok(Command::Go("/profile".into())));
    }

    #[test]
    fn test_parse_search_joins_terms() {
        assert_eq!(
            parse_command("search software engineer"),
            Ok(Command::Search(Some("software engineer".into())))
        );
        assert_eq!(parse_command("search"), Ok(Command::Search(None)));
    }

    #[test]
    fn test_parse_apply_rejects_non_numeric() {
        assert_eq!(parse_command("apply 42"), Ok(Command::Apply(42)));
        assert!(parse_command("apply forty-two").is_err());
    }

    #[test]
    fn test_parse_signup_needs_all_fields() {
        assert!(parse_command("signup bob pw Bob").is_err());
        assert!(matches!(
            parse_command("signup bob pw Bob Builder bob@x.io"),
            Ok(Command::Signup { .. })
        ));
    }

    #[test]
    fn test_parse_profile_pairs() {
        assert_eq!(
            parse_command("profile firstName=Al email=al@x.io"),
            Ok(Command::Profile(vec![
                ("firstName".into(), "Al".into()),
                ("email".into(), "al@x.io".into())
            ]))
        );
        assert!(parse_command("profile firstName").is_err());
        assert!(parse_command("").is_err());
    }

    #[test]
    fn test_profile_update_rejects_unknown_field() {
        let pairs = vec![("username".to_string(), "x".to_string())];
        assert!(profile_update(&pairs).is_err());
    }

    #[tokio::test]
    async fn test_protected_page_redirects_to_login() {
        let mut shell = shell();
        let out = shell.handle(Command::Go("/jobs".into())).await.unwrap();
        assert_eq!(shell.current(), &Route::Login);
        assert!(out.contains("/jobs is not available, showing /login"));
    }

    #[tokio::test]
    async fn test_login_then_logout_flow() {
        let mut shell = shell();
        let out = shell
            .handle(Command::Login("alice".into(), "secret".into()))
            .await
            .unwrap();
        assert_eq!(shell.current(), &Route::Companies);
        assert!(out.contains("Acme Corp"));

        shell.handle(Command::Go("/jobs".into())).await.unwrap();
        let out = shell.handle(Command::Apply(7)).await.unwrap();
        assert!(out.contains("Applied to job 7."));
        let out = shell.handle(Command::Apply(3)).await.unwrap();
        assert!(out.contains("Already applied to job 3."));

        shell.handle(Command::Logout).await.unwrap();
        assert_eq!(shell.current(), &Route::Home);
    }

    #[tokio::test]
    async fn test_failed_login_stays_put() {
        let mut shell = shell();
        shell.handle(Command::Go("/login".into())).await.unwrap();
        let out = shell
            .handle(Command::Login("alice".into(), "nope".into()))
            .await
            .unwrap();
        assert!(out.starts_with("Login failed: Invalid username/password"));
        assert_eq!(shell.current(), &Route::Login);
    }

    #[tokio::test]
    async fn test_search_only_on_lists() {
        let mut shell = shell();
        let out = shell
            .handle(Command::Search(Some("x".into())))
            .await
            .unwrap();
        assert!(out.contains("Search works on /companies and /jobs."));
    }

    #[tokio::test]
    async fn test_quit() {
        assert_eq!(shell().handle(Command::Quit).await, None);
    }
}
