#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use mentorat::{
    io,
    model::{AssignmentId, BatchId, ClassId, ImportId, LeaveRequestId, Mentee, MenteeId, Mentor, MentorId, SessionId},
    AttendanceMark, JsonStorage, LeaveDecision, Policy, RecurrenceSpec, SchedError, Scheduler,
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI du programme de mentorat (sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du registre
    #[arg(long, global = true, default_value = "registry.json")]
    data: String,

    /// Fichier JSON de politique (plafond, tailles de batch, fuseau...)
    #[arg(long, global = true)]
    policy: Option<String>,

    /// Horloge figée (RFC3339 UTC), utile pour rejouer une opération
    #[arg(long, global = true)]
    now: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

/// Calendrier hebdomadaire saisi en heure locale.
#[derive(clap::Args, Debug)]
struct Recurrence {
    /// Date de début YYYY-MM-DD
    #[arg(long)]
    start_date: String,
    /// Jour de la semaine, 0 = lundi … 6 = dimanche
    #[arg(long)]
    weekday: u8,
    /// Heure locale HH:MM
    #[arg(long)]
    time: String,
    /// Nombre de séances
    #[arg(long)]
    weeks: u32,
}

impl Recurrence {
    fn to_spec(&self) -> Result<RecurrenceSpec, SchedError> {
        RecurrenceSpec::parse(&self.start_date, self.weekday, &self.time, self.weeks)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Decision {
    Approve,
    Decline,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mark {
    Present,
    Absent,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Créer une classe
    AddClass {
        #[arg(long)]
        name: String,
    },
    /// Archiver une classe
    ArchiveClass {
        #[arg(long)]
        class: String,
    },
    /// Supprimer une classe (cascade)
    DeleteClass {
        #[arg(long)]
        class: String,
    },
    /// Créer un mentor
    AddMentor {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        department: Option<String>,
    },
    /// Supprimer un mentor (cascade)
    DeleteMentor {
        #[arg(long)]
        mentor: String,
    },
    /// Créer un étudiant
    AddMentee {
        #[arg(long)]
        class: String,
        #[arg(long)]
        reg_num: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Préparer un import CSV (reg_num,name[,email])
    StageImport {
        #[arg(long)]
        class: String,
        #[arg(long)]
        csv: String,
    },
    /// Confirmer un import préparé
    ConfirmImport {
        #[arg(long)]
        import: String,
    },
    /// Découper les étudiants sans batch d'une classe
    AutoBatch {
        #[arg(long)]
        class: String,
    },
    /// Placer des étudiants dans un batch existant
    ManualBatch {
        #[arg(long)]
        batch: String,
        /// liste "id1,id2,..."
        #[arg(long)]
        students: String,
    },
    /// Affecter un mentor à un batch
    Assign {
        #[arg(long)]
        mentor: String,
        #[arg(long)]
        batch: String,
        #[command(flatten)]
        recurrence: Recurrence,
    },
    /// Retirer le mentor d'un batch
    Unassign {
        #[arg(long)]
        assignment: String,
    },
    /// Replanifier les séances futures
    Reschedule {
        #[arg(long)]
        assignment: String,
        #[command(flatten)]
        recurrence: Recurrence,
    },
    /// Confier le batch à un autre mentor
    Reassign {
        #[arg(long)]
        assignment: String,
        #[arg(long)]
        mentor: String,
        #[command(flatten)]
        recurrence: Recurrence,
    },
    /// Remplacement temporaire
    Substitute {
        #[arg(long)]
        assignment: String,
        #[arg(long)]
        mentor: String,
        /// YYYY-MM-DD
        #[arg(long)]
        from: String,
        /// YYYY-MM-DD
        #[arg(long)]
        to: String,
    },
    /// Fin du remplacement temporaire
    EndSubstitute {
        #[arg(long)]
        assignment: String,
    },
    StartSession {
        #[arg(long)]
        session: String,
        #[arg(long)]
        mentor: String,
    },
    EndSession {
        #[arg(long)]
        session: String,
        #[arg(long)]
        mentor: String,
    },
    /// Marquer les séances manquées
    SweepMissed,
    RequestLeave {
        #[arg(long)]
        session: String,
        #[arg(long)]
        mentee: String,
        #[arg(long)]
        reason: String,
    },
    ActionLeave {
        #[arg(long)]
        request: String,
        #[arg(long)]
        mentor: String,
        #[arg(long, value_enum)]
        decision: Decision,
    },
    /// Présence / absence d'un étudiant
    Attendance {
        #[arg(long)]
        session: String,
        #[arg(long)]
        mentor: String,
        #[arg(long)]
        mentee: String,
        #[arg(long, value_enum)]
        status: Mark,
    },
    /// Lister les séances (heure locale)
    List,
    /// Exporter le registre et/ou les séances
    Export {
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, SchedError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| SchedError::Validation(format!("invalid date '{s}', expected YYYY-MM-DD")))
}

/// Résultat d'une commande : faut-il sauvegarder le registre ?
enum Outcome {
    Saved,
    ReadOnly,
}

fn run(cmd: Commands, scheduler: &mut Scheduler, now: DateTime<Utc>) -> Result<Outcome, SchedError> {
    let outcome = match cmd {
        Commands::AddClass { name } => {
            println!("{}", scheduler.add_class(&name)?);
            Outcome::Saved
        }
        Commands::ArchiveClass { class } => {
            scheduler.archive_class(&ClassId::new(class))?;
            Outcome::Saved
        }
        Commands::DeleteClass { class } => {
            scheduler.delete_class(&ClassId::new(class))?;
            Outcome::Saved
        }
        Commands::AddMentor {
            name,
            email,
            department,
        } => {
            let mut mentor = Mentor::new(name);
            mentor.email = email;
            mentor.department = department;
            println!("{}", scheduler.add_mentor(mentor)?);
            Outcome::Saved
        }
        Commands::DeleteMentor { mentor } => {
            scheduler.delete_mentor(&MentorId::new(mentor))?;
            Outcome::Saved
        }
        Commands::AddMentee {
            class,
            reg_num,
            name,
            email,
        } => {
            let mut mentee = Mentee::new(reg_num, name, ClassId::new(class));
            mentee.email = email;
            println!("{}", scheduler.add_mentee(mentee)?);
            Outcome::Saved
        }
        Commands::StageImport { class, csv } => {
            let rows = io::read_mentee_csv(&csv).map_err(|e| SchedError::Validation(format!("{e:#}")))?;
            let count = rows.len();
            let id = scheduler.stage_import(&ClassId::new(class), rows, now)?;
            println!("{id} ({count} rows, confirm within {} minutes)", scheduler.policy().import_ttl_minutes);
            Outcome::Saved
        }
        Commands::ConfirmImport { import } => {
            let created = scheduler.confirm_import(&ImportId::new(import), now)?;
            println!("{} mentees created", created.len());
            Outcome::Saved
        }
        Commands::AutoBatch { class } => {
            for id in scheduler.auto_batch(&ClassId::new(class))? {
                if let Some(b) = scheduler.registry().find_batch(&id) {
                    println!("{} | {} | {} mentees", id, b.name, scheduler.registry().mentee_count(&id));
                }
            }
            Outcome::Saved
        }
        Commands::ManualBatch { batch, students } => {
            let ids: Vec<MenteeId> = students
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(MenteeId::new)
                .collect();
            let moved = scheduler.manual_batch(&BatchId::new(batch), &ids)?;
            println!("{moved} mentees moved");
            Outcome::Saved
        }
        Commands::Assign {
            mentor,
            batch,
            recurrence,
        } => {
            let spec = recurrence.to_spec()?;
            let id = scheduler.create_assignment(&MentorId::new(mentor), &BatchId::new(batch), &spec)?;
            println!("{id}");
            Outcome::Saved
        }
        Commands::Unassign { assignment } => {
            scheduler.unassign(&AssignmentId::new(assignment), now)?;
            Outcome::Saved
        }
        Commands::Reschedule {
            assignment,
            recurrence,
        } => {
            let spec = recurrence.to_spec()?;
            scheduler.reschedule(&AssignmentId::new(assignment), &spec, now)?;
            Outcome::Saved
        }
        Commands::Reassign {
            assignment,
            mentor,
            recurrence,
        } => {
            let spec = recurrence.to_spec()?;
            let id = scheduler.reassign(&AssignmentId::new(assignment), &MentorId::new(mentor), &spec, now)?;
            println!("{id}");
            Outcome::Saved
        }
        Commands::Substitute {
            assignment,
            mentor,
            from,
            to,
        } => {
            let (from, to) = (parse_date(&from)?, parse_date(&to)?);
            scheduler.assign_substitute(&AssignmentId::new(assignment), &MentorId::new(mentor), from, to)?;
            Outcome::Saved
        }
        Commands::EndSubstitute { assignment } => {
            scheduler.end_substitution(&AssignmentId::new(assignment))?;
            Outcome::Saved
        }
        Commands::StartSession { session, mentor } => {
            scheduler.start_session(&SessionId::new(session), &MentorId::new(mentor), now)?;
            Outcome::Saved
        }
        Commands::EndSession { session, mentor } => {
            scheduler.end_session(&SessionId::new(session), &MentorId::new(mentor), now)?;
            Outcome::Saved
        }
        Commands::SweepMissed => {
            let report = scheduler.sweep_missed(now);
            println!("{} session(s) marked as missed", report.marked.len());
            for (id, reason) in &report.failed {
                eprintln!("skipped {id}: {reason}");
            }
            Outcome::Saved
        }
        Commands::RequestLeave {
            session,
            mentee,
            reason,
        } => {
            let id = scheduler.request_leave(&SessionId::new(session), &MenteeId::new(mentee), &reason, now)?;
            println!("{id}");
            Outcome::Saved
        }
        Commands::ActionLeave {
            request,
            mentor,
            decision,
        } => {
            let decision = match decision {
                Decision::Approve => LeaveDecision::Approve,
                Decision::Decline => LeaveDecision::Decline,
            };
            let status = scheduler.action_leave(&LeaveRequestId::new(request), &MentorId::new(mentor), decision, now)?;
            println!("{status:?}");
            Outcome::Saved
        }
        Commands::Attendance {
            session,
            mentor,
            mentee,
            status,
        } => {
            let mark = match status {
                Mark::Present => AttendanceMark::Present,
                Mark::Absent => AttendanceMark::Absent,
            };
            scheduler.mark_attendance(&SessionId::new(session), &MentorId::new(mentor), &MenteeId::new(mentee), mark)?;
            Outcome::Saved
        }
        Commands::List => {
            // impression compacte
            for row in io::session_rows(scheduler.registry(), scheduler.zone()) {
                println!(
                    "{} | #{} | {} {} | {} | {} | {}",
                    row.session_id, row.number, row.class, row.batch, row.mentor, row.start_local, row.status
                );
            }
            Outcome::ReadOnly
        }
        Commands::Export { out_json, out_csv } => {
            if let Some(path) = out_json {
                io::export_registry_json(path, scheduler.registry())?;
            }
            if let Some(path) = out_csv {
                io::export_sessions_csv(path, scheduler.registry(), scheduler.zone())?;
            }
            Outcome::ReadOnly
        }
    };
    Ok(outcome)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let policy = match &cli.policy {
        Some(path) => Policy::load_from_file(path)?,
        None => Policy::default(),
    };
    let now = match &cli.now {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid --now '{s}'"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let storage = JsonStorage::open(&cli.data)?;
    let registry = storage.load_or_default()?;
    let mut scheduler = Scheduler::with_policy(policy)?.with_registry(registry);

    let snapshot = scheduler.registry().clone();
    let result = run(cli.cmd, &mut scheduler, now).and_then(|outcome| match outcome {
        Outcome::Saved => scheduler.persist(&storage),
        Outcome::ReadOnly => Ok(()),
    });

    if let Err(err) = result {
        // un import expiré est retiré même en cas d'échec
        if scheduler.registry() != &snapshot {
            if let Err(save_err) = scheduler.persist(&storage) {
                eprintln!("{}", save_err.to_response());
            }
        }
        eprintln!("{}", err.to_response());
        std::process::exit(1);
    }
    Ok(())
}
