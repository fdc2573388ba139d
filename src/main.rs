//! CLI entry point for the grade book.
//!
//! Every command loads the book from `<data_dir>/gradebook.json`, runs one
//! operation and saves the book again if the operation changed it.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gradebook::{
    config::AppConfig,
    gdpr::{self, ConsentSettings, ErasureScope, ExportScope, FormTemplate},
    models::{GradeValue, NewStudent, parse_grade_date},
    notify::{Dispatcher, notify_guardians},
    reminders::NewReminder,
    report::{NotificationOptions, build_overview, grades_view, render_workbook, student_profile},
    store::{GradeBook, GradeEntry, MissingDatePolicy},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Class grade book: grades, averages, reports and guardian notifications", long_about = None)]
struct Cli {
    /// Optional JSON config file; environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage students
    #[command(subcommand)]
    Student(StudentCommand),
    /// Manage subjects
    #[command(subcommand)]
    Subject(SubjectCommand),
    /// Record and edit grades
    #[command(subcommand)]
    Grade(GradeCommand),
    /// List grades grouped by student and subject
    View {
        #[arg(long)]
        student: Option<u32>,
        #[arg(long)]
        subject: Option<u32>,
    },
    /// Show one student's grades and averages
    Profile { id: u32 },
    /// Export the whole book as an .xlsx workbook
    ExportXlsx {
        /// Output file (default: <data_dir>/grades_<timestamp>.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Email guardians their children's grades
    Notify(NotifyArgs),
    /// Data protection tools
    #[command(subcommand)]
    Gdpr(GdprCommand),
    /// Weekly reminders
    #[command(subcommand)]
    Reminder(ReminderCommand),
}

#[derive(Args)]
struct StudentFields {
    #[arg(long)]
    name: String,
    #[arg(long = "class")]
    class_name: String,
    #[arg(long)]
    guardian: String,
    #[arg(long)]
    email: String,
}

impl From<StudentFields> for NewStudent {
    fn from(f: StudentFields) -> Self {
        NewStudent::new(f.name, f.class_name, f.guardian, f.email)
    }
}

#[derive(Subcommand)]
enum StudentCommand {
    Add(StudentFields),
    Update {
        id: u32,
        #[command(flatten)]
        fields: StudentFields,
    },
    /// Delete a student and all of their grades
    Delete { id: u32 },
    List,
}

#[derive(Subcommand)]
enum SubjectCommand {
    Add { name: String },
    Rename { id: u32, name: String },
    /// Delete a subject (refused while grades reference it)
    Delete { id: u32 },
    List,
    /// Add the default subject catalogue to an empty book
    Seed,
}

#[derive(Subcommand)]
enum GradeCommand {
    Add {
        #[arg(long)]
        student: u32,
        #[arg(long)]
        subject: u32,
        #[arg(long)]
        value: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Add several grades at once; invalid entries are skipped
    Bulk {
        #[arg(long)]
        student: u32,
        #[arg(long)]
        subject: u32,
        /// VALUE@YYYY-MM-DD, repeatable
        #[arg(long = "entry", required = true)]
        entries: Vec<String>,
    },
    Update {
        id: u32,
        #[arg(long)]
        value: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        subject: u32,
    },
    Delete { id: u32 },
}

#[derive(Args)]
struct NotifyArgs {
    /// Limit to these students (default: everyone)
    #[arg(long = "student")]
    students: Vec<u32>,
    /// Message text; "Dear parent" is personalised with the guardian's name
    #[arg(long)]
    content: Option<String>,
    /// Leave out the grade and average lines
    #[arg(long)]
    no_grades: bool,
    /// Append the data protection notice
    #[arg(long)]
    gdpr: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportScopeArg {
    Student,
    Guardian,
    All,
}

impl From<ExportScopeArg> for ExportScope {
    fn from(s: ExportScopeArg) -> Self {
        match s {
            ExportScopeArg::Student => ExportScope::Student,
            ExportScopeArg::Guardian => ExportScope::Guardian,
            ExportScopeArg::All => ExportScope::All,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ErasureScopeArg {
    Student,
    StudentComplete,
    Guardian,
    All,
}

impl From<ErasureScopeArg> for ErasureScope {
    fn from(s: ErasureScopeArg) -> Self {
        match s {
            ErasureScopeArg::Student => ErasureScope::Student,
            ErasureScopeArg::StudentComplete => ErasureScope::StudentComplete,
            ErasureScopeArg::Guardian => ErasureScope::Guardian,
            ErasureScopeArg::All => ErasureScope::All,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum GdprCommand {
    /// Show the recorded consent settings
    Consent,
    /// Record consent settings
    SetConsent {
        #[arg(long)]
        storage: bool,
        #[arg(long)]
        email: bool,
        #[arg(long)]
        stats: bool,
        #[arg(long)]
        retention: bool,
        #[arg(long, default_value = "")]
        contact_name: String,
        #[arg(long, default_value = "")]
        contact_email: String,
    },
    /// Export everything held about a student
    Export {
        student: u32,
        #[arg(long, value_enum, default_value = "all")]
        scope: ExportScopeArg,
        #[arg(long, value_enum, default_value = "json")]
        format: ExportFormat,
        #[arg(long)]
        anonymize: bool,
        /// Directory to write the export to (default: data dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Erase or anonymise a student's data
    Erase {
        student: u32,
        #[arg(long, value_enum)]
        scope: ErasureScopeArg,
        #[arg(long)]
        anonymize: bool,
        /// Must be DELETE
        #[arg(long)]
        confirm: String,
    },
    /// Show the consent form template
    FormTemplate,
    /// Edit the consent form template; omitted fields keep their text
    SetFormTemplate {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        intro: Option<String>,
        #[arg(long)]
        data_collected: Option<String>,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        rights: Option<String>,
        #[arg(long)]
        contact: Option<String>,
    },
    /// Render one student's consent form as PDF
    FormPdf {
        student: u32,
        #[arg(long)]
        no_signature: bool,
    },
    /// Zip the consent forms of every student
    FormsZip {
        #[arg(long)]
        no_signature: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Email every guardian their consent form
    SendForms,
}

#[derive(Args)]
struct ReminderFields {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    /// 0 = Monday .. 6 = Sunday
    #[arg(long, default_value_t = 4)]
    day: u8,
    /// HH:MM
    #[arg(long, default_value = "17:00")]
    time: String,
}

impl From<ReminderFields> for NewReminder {
    fn from(f: ReminderFields) -> Self {
        NewReminder {
            title: f.title,
            description: f.description,
            day_of_week: f.day,
            time_of_day: f.time,
        }
    }
}

#[derive(Subcommand)]
enum ReminderCommand {
    Add(ReminderFields),
    Update {
        id: u32,
        #[command(flatten)]
        fields: ReminderFields,
        #[arg(long)]
        inactive: bool,
    },
    /// Restrict a school-time-only reminder to the school year
    SchoolYear {
        id: u32,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    Toggle { id: u32 },
    Delete { id: u32 },
    List,
    /// Report reminders due now and mark them as triggered
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gradebook.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gradebook.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let book_path = config.book_path();
    let mut book = GradeBook::load(&book_path)?;

    let changed = run(cli.command, &config, &mut book).await?;
    if changed {
        book.save(&book_path)?;
    }

    Ok(())
}

/// Runs one command; returns whether the book must be saved.
async fn run(command: Commands, config: &AppConfig, book: &mut GradeBook) -> Result<bool> {
    match command {
        Commands::Student(cmd) => student_command(cmd, book),
        Commands::Subject(cmd) => subject_command(cmd, book),
        Commands::Grade(cmd) => grade_command(cmd, book),
        Commands::View { student, subject } => {
            for view in grades_view(book, student, subject) {
                info!(
                    student_id = view.id,
                    student = %view.name,
                    class = %view.class_name,
                    overall = view.overall_average,
                    "Student"
                );
                for subject in &view.subjects {
                    let grades: Vec<String> = subject
                        .grades
                        .iter()
                        .map(|g| format!("{} ({})", g.value, g.date.format("%d.%m.%Y")))
                        .collect();
                    info!(
                        subject = %subject.name,
                        average = ?subject.average,
                        count = subject.count,
                        grades = %grades.join(", "),
                        "  Subject"
                    );
                }
            }
            Ok(false)
        }
        Commands::Profile { id } => {
            let profile = student_profile(book, id)?;
            info!(
                student = %profile.student.name,
                class = %profile.student.class_name,
                guardian = %profile.student.guardian_name,
                average = %format!("{:.2}", profile.average),
                "Profile"
            );
            for subject in &profile.subjects {
                info!(
                    subject = %subject.subject,
                    average = %format!("{:.2}", subject.average),
                    grades = ?subject.values(),
                    "  Subject"
                );
            }
            Ok(false)
        }
        Commands::ExportXlsx { output } => {
            let bytes = render_workbook(&build_overview(book))?;
            let path = output.unwrap_or_else(|| {
                config
                    .data_dir
                    .join(format!("grades_{}.xlsx", Local::now().format("%Y%m%d_%H%M%S")))
            });
            write_file(&path, &bytes)?;
            info!(path = %path.display(), bytes = bytes.len(), "Workbook exported");
            Ok(false)
        }
        Commands::Notify(args) => {
            let dispatcher = Dispatcher::from_config(&config.dispatch)?;
            let mut options = NotificationOptions {
                include_grades: !args.no_grades,
                include_gdpr: args.gdpr,
                ..Default::default()
            };
            if let Some(content) = args.content {
                options.content = content;
            }
            let summary = notify_guardians(
                &dispatcher,
                book,
                &args.students,
                &options,
                config.dispatch.throttle(),
            )
            .await;
            for detail in &summary.details {
                info!(recipient = %detail.email, status = %detail.status, "Recipient");
            }
            if summary.failed > 0 {
                warn!("{} of {} notifications failed", summary.failed, summary.total);
            }
            Ok(false)
        }
        Commands::Gdpr(cmd) => gdpr_command(cmd, config, book).await,
        Commands::Reminder(cmd) => reminder_command(cmd, book),
    }
}

fn student_command(cmd: StudentCommand, book: &mut GradeBook) -> Result<bool> {
    match cmd {
        StudentCommand::Add(fields) => {
            let id = book.add_student(fields.into())?;
            info!(student_id = id, "Student added");
        }
        StudentCommand::Update { id, fields } => {
            book.update_student(id, fields.into())?;
            info!(student_id = id, "Student updated");
        }
        StudentCommand::Delete { id } => {
            let removed = book.delete_student(id)?;
            info!(student_id = id, grades_removed = removed, "Student deleted");
        }
        StudentCommand::List => {
            for (class_name, students) in book.students_by_class() {
                info!(class = %class_name, students = students.len(), "Class");
                for s in students {
                    info!(
                        id = s.id,
                        name = %s.name,
                        guardian = %s.guardian_name,
                        email = %s.guardian_email,
                        "  Student"
                    );
                }
            }
            return Ok(false);
        }
    }
    Ok(true)
}

fn subject_command(cmd: SubjectCommand, book: &mut GradeBook) -> Result<bool> {
    match cmd {
        SubjectCommand::Add { name } => {
            let id = book.add_subject(&name)?;
            info!(subject_id = id, name = %name.trim(), "Subject added");
        }
        SubjectCommand::Rename { id, name } => {
            book.rename_subject(id, &name)?;
            info!(subject_id = id, "Subject renamed");
        }
        SubjectCommand::Delete { id } => {
            book.delete_subject(id)?;
            info!(subject_id = id, "Subject deleted");
        }
        SubjectCommand::List => {
            for s in book.subjects_sorted() {
                info!(id = s.id, name = %s.name, "Subject");
            }
            return Ok(false);
        }
        SubjectCommand::Seed => {
            let added = book.seed_default_subjects();
            info!(added, "Default subjects");
            return Ok(added > 0);
        }
    }
    Ok(true)
}

fn grade_command(cmd: GradeCommand, book: &mut GradeBook) -> Result<bool> {
    match cmd {
        GradeCommand::Add {
            student,
            subject,
            value,
            date,
        } => {
            let value = GradeValue::parse(&value)?;
            let date = match date {
                Some(raw) => parse_grade_date(&raw)?,
                None => Local::now().date_naive(),
            };
            let id = book.add_grade(student, subject, value, date)?;
            info!(grade_id = id, "Grade added");
        }
        GradeCommand::Bulk {
            student,
            subject,
            entries,
        } => {
            let entries: Vec<GradeEntry> = entries
                .iter()
                .map(|raw| match raw.split_once('@') {
                    Some((value, date)) => GradeEntry::new(value, Some(date)),
                    None => GradeEntry::new(raw.as_str(), None),
                })
                .collect();
            let added = book.add_grades(student, subject, &entries, MissingDatePolicy::Skip)?;
            if added == 0 {
                warn!("No valid grade was added");
                return Ok(false);
            }
            info!(added, skipped = entries.len() - added, "Grades added");
        }
        GradeCommand::Update {
            id,
            value,
            date,
            subject,
        } => {
            book.update_grade(id, &value, &date, subject)?;
            info!(grade_id = id, "Grade updated");
        }
        GradeCommand::Delete { id } => {
            book.delete_grade(id)?;
            info!(grade_id = id, "Grade deleted");
        }
    }
    Ok(true)
}

async fn gdpr_command(cmd: GdprCommand, config: &AppConfig, book: &mut GradeBook) -> Result<bool> {
    let data_dir = &config.data_dir;
    match cmd {
        GdprCommand::Consent => {
            let settings = ConsentSettings::load(data_dir)?;
            info!(settings = ?settings, storage = settings.has_storage_consent(), "Consent");
        }
        GdprCommand::SetConsent {
            storage,
            email,
            stats,
            retention,
            contact_name,
            contact_email,
        } => {
            let mut settings = ConsentSettings {
                consent_storage: storage,
                consent_email: email,
                consent_stats: stats,
                consent_retention: retention,
                gdpr_contact_name: contact_name,
                gdpr_contact_email: contact_email,
                updated_at: None,
            };
            settings.save(data_dir)?;
        }
        GdprCommand::Export {
            student,
            scope,
            format,
            anonymize,
            output,
        } => {
            let mut data = gdpr::build_export(book, student, scope.into())?;
            if anonymize {
                data = gdpr::anonymize(&data);
            }
            let file = match format {
                ExportFormat::Json => gdpr::export_as_json(&data)?,
                ExportFormat::Csv => gdpr::export_as_csv(&data)?,
            };
            let path = output.unwrap_or_else(|| data_dir.clone()).join(&file.filename);
            write_file(&path, &file.content)?;
            info!(path = %path.display(), content_type = file.content_type, "Export written");
        }
        GdprCommand::Erase {
            student,
            scope,
            anonymize,
            confirm,
        } => {
            let outcome = gdpr::erase(book, student, scope.into(), anonymize, &confirm)?;
            info!(?outcome, "Data processed");
            return Ok(true);
        }
        GdprCommand::FormTemplate => {
            let template = FormTemplate::load(data_dir)?;
            info!("{}", serde_json::to_string_pretty(&template)?);
        }
        GdprCommand::SetFormTemplate {
            title,
            intro,
            data_collected,
            purpose,
            rights,
            contact,
        } => {
            let mut template = FormTemplate::load(data_dir)?;
            let fields = [
                (title, &mut template.title),
                (intro, &mut template.intro),
                (data_collected, &mut template.data_collected),
                (purpose, &mut template.purpose),
                (rights, &mut template.rights),
                (contact, &mut template.contact),
            ];
            for (value, field) in fields {
                if let Some(value) = value {
                    *field = value;
                }
            }
            template.save(data_dir)?;
        }
        GdprCommand::FormPdf {
            student,
            no_signature,
        } => {
            let template = FormTemplate::load(data_dir)?;
            let dispatcher = Dispatcher::from_config(&config.dispatch)?;
            let student = book.student(student)?;
            let path =
                gdpr::render_form_pdf(dispatcher.artifacts(), student, &template, !no_signature)
                    .await?;
            info!(path = %path.display(), "Consent form written");
        }
        GdprCommand::FormsZip {
            no_signature,
            output,
        } => {
            let template = FormTemplate::load(data_dir)?;
            let dispatcher = Dispatcher::from_config(&config.dispatch)?;
            let bytes =
                gdpr::forms_archive(dispatcher.artifacts(), book, &template, !no_signature).await?;
            let path = output.unwrap_or_else(|| data_dir.join("gdpr_forms.zip"));
            write_file(&path, &bytes)?;
            info!(path = %path.display(), "Consent forms archived");
        }
        GdprCommand::SendForms => {
            let template = FormTemplate::load(data_dir)?;
            let dispatcher = Dispatcher::from_config(&config.dispatch)?;
            let summary =
                gdpr::send_forms(&dispatcher, book, &template, config.dispatch.throttle()).await;
            if summary.delivered < summary.total {
                warn!(
                    not_delivered = summary.total - summary.delivered,
                    "Some consent forms were only saved locally"
                );
            }
        }
    }
    Ok(false)
}

fn reminder_command(cmd: ReminderCommand, book: &mut GradeBook) -> Result<bool> {
    match cmd {
        ReminderCommand::Add(fields) => {
            let id = book.add_reminder(fields.into())?;
            info!(reminder_id = id, "Reminder added");
        }
        ReminderCommand::Update {
            id,
            fields,
            inactive,
        } => {
            book.update_reminder(id, fields.into(), !inactive)?;
            info!(reminder_id = id, "Reminder updated");
        }
        ReminderCommand::SchoolYear { id, start, end } => {
            let parse = |raw: Option<String>| -> Result<Option<NaiveDate>> {
                Ok(raw.map(|r| parse_grade_date(&r)).transpose()?)
            };
            book.set_reminder_school_year(id, parse(start)?, parse(end)?)?;
            info!(reminder_id = id, "School year set");
        }
        ReminderCommand::Toggle { id } => {
            let active = book.toggle_reminder(id)?;
            info!(reminder_id = id, active, "Reminder toggled");
        }
        ReminderCommand::Delete { id } => {
            book.delete_reminder(id)?;
            info!(reminder_id = id, "Reminder deleted");
        }
        ReminderCommand::List => {
            for r in book.reminders_sorted() {
                info!(
                    id = r.id,
                    title = %r.title,
                    day = r.day_name(),
                    time = %r.time_of_day,
                    active = r.active,
                    "Reminder"
                );
            }
            return Ok(false);
        }
        ReminderCommand::Check => {
            let due = book.check_due_reminders(Local::now().naive_local());
            for r in &due {
                info!(
                    id = r.id,
                    title = %r.title,
                    description = r.description.as_deref().unwrap_or_default(),
                    "Reminder due"
                );
            }
            return Ok(!due.is_empty());
        }
    }
    Ok(true)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))
}
