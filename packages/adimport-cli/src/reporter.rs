use adimport_core::{
    batch::BatchOutcome,
    report::{ImportEvent, ImportReporter},
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Reporter that prints each event as a styled line above a progress bar
pub struct ConsoleReporter {
    bar: ProgressBar,
}

impl ConsoleReporter {
    pub fn new(total: usize) -> eyre::Result<Self> {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} records")?
                .progress_chars("=> "),
        );

        Ok(Self { bar })
    }

    /// Print a line to stdout without tearing the progress bar
    fn println(&self, line: String) {
        self.bar.suspend(|| println!("{line}"));
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

impl ImportReporter for ConsoleReporter {
    fn report(&mut self, event: ImportEvent) {
        match event {
            ImportEvent::OrganizationUnitCreated { dn } => {
                self.println(format!("{} created {dn}", "OK".green().bold()));
            }
            ImportEvent::OrganizationFailed { message } | ImportEvent::UserFailed { message } => {
                self.println(format!("{} {message}", "ERROR".red().bold()));
            }
            ImportEvent::UserExists { account_name } => {
                self.println(format!(
                    "{} user {account_name} already exists, updating",
                    "EXISTS".yellow().bold()
                ));
            }
            ImportEvent::UserCreated { account_name } => {
                self.println(format!(
                    "{} created user {account_name}",
                    "OK".green().bold()
                ));
            }
            ImportEvent::GroupMemberAdded {
                group,
                account_name,
            } => {
                self.println(format!(
                    "{} added {account_name} to {group}",
                    "OK".green().bold()
                ));
            }
            // Group membership is best effort, failures are only logged
            ImportEvent::GroupMemberSkipped { .. } => {}
            ImportEvent::RecordCompleted { .. } => self.bar.inc(1),
        }
    }
}

/// Final summary line for the import
pub fn summary(outcome: &BatchOutcome) -> String {
    let errors = format!("{} errors", outcome.errors);
    let errors = if outcome.errors == 0 {
        errors.green().bold()
    } else {
        errors.red().bold()
    };

    format!(
        "Import finished: {} records ({} organizations, {} users, {} skipped), {errors}",
        outcome.records, outcome.organizations, outcome.users, outcome.skipped
    )
}
