//! Subcommand handlers. Everything user-facing is printed here.

use std::collections::HashMap;

use diy_core::catalog::CatalogQuery;
use diy_core::forms::{LoginDraft, RegistrationDraft};
use diy_core::model::{LearningStatus, Tutorial, TutorialId, UserProfile};
use services::{AppServices, AuthError, CatalogError, LearningCard, TutorialSession};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::args::ThemeAction;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn format_secs(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

fn progress_bar(percentage: u8) -> String {
    let filled = usize::from(percentage / 10);
    format!("[{}{}] {percentage:>3}%", "#".repeat(filled), ".".repeat(10 - filled))
}

// ─── Home ────────────────────────────────────────────────────────────────────

pub async fn tutorials(services: &AppServices, query: &CatalogQuery) -> CommandResult {
    let user = services.session().current_user();
    let list = services.catalog().list(query, user.as_ref()).await?;
    let statuses = match &user {
        Some(user) => services.catalog().statuses(&user.email).await,
        None => HashMap::new(),
    };

    if list.is_empty() {
        println!("Tidak ada tutorial yang cocok.");
        return Ok(());
    }
    for tutorial in &list {
        let marker = match statuses.get(&tutorial.id) {
            Some(LearningStatus::Completed) => "[selesai]",
            Some(LearningStatus::Ongoing) => "[berjalan]",
            None => "",
        };
        println!(
            "{:<26} {} {marker}\n    {} | {} | {} | {}",
            tutorial.id.as_str(),
            tutorial.title,
            tutorial.category,
            tutorial.difficulty,
            tutorial.duration,
            tutorial.media_type,
        );
    }
    Ok(())
}

// ─── Detail ──────────────────────────────────────────────────────────────────

fn print_overview(tutorial: &Tutorial) {
    println!("{}", tutorial.title);
    println!(
        "{} | {} | {} | {} langkah",
        tutorial.category,
        tutorial.difficulty,
        tutorial.duration,
        tutorial.total_steps()
    );
    if !tutorial.description.is_empty() {
        println!();
        println!("{}", tutorial.description);
    }
    if !tutorial.tools.is_empty() {
        println!();
        println!("Alat dan bahan:");
        for tool in &tutorial.tools {
            println!("  - {tool}");
        }
    }
}

pub async fn show(services: &AppServices, id: &TutorialId) -> CommandResult {
    let tutorial = match services.catalog().tutorial(id).await {
        Ok(tutorial) => tutorial,
        Err(CatalogError::NotFound) => {
            println!("Tutorial tidak ditemukan");
            return Err(CatalogError::NotFound.into());
        }
        Err(err) => return Err(err.into()),
    };
    print_overview(&tutorial);
    println!();
    for step in &tutorial.steps {
        println!("{}. {}", step.number, step.title);
    }
    Ok(())
}

fn print_step(session: &TutorialSession) {
    let tracker = session.tracker();
    let current = tracker.current_step();
    println!();
    println!(
        "Langkah {current} dari {}  {}  waktu {}",
        tracker.total_steps(),
        progress_bar(tracker.percentage()),
        format_secs(session.elapsed_secs())
    );
    let strip: Vec<String> = (1..=tracker.total_steps())
        .map(|n| match (n == current, tracker.is_step_completed(n)) {
            (true, _) => format!("({n})"),
            (false, true) => format!("[{n}]"),
            (false, false) => format!(" {n} "),
        })
        .collect();
    println!("{}", strip.join(""));

    if let Some(step) = session.current_step() {
        let done = if tracker.is_step_completed(current) {
            " (selesai)"
        } else {
            ""
        };
        println!("{}{done}", step.title);
        if !step.content.is_empty() {
            println!("{}", step.content);
        }
        for detail in &step.details {
            println!("  * {detail}");
        }
        if let Some(tips) = &step.tips {
            println!("Tips: {tips}");
        }
        if let Some(video) = &step.video_url {
            println!("Video: {video}");
        }
    }
    println!("[n]ext [p]rev [j <k>] [c]omplete [q]uit");
}

pub async fn learn(services: &AppServices, id: &TutorialId) -> CommandResult {
    let mut session = services.open_tutorial(id).await?;
    print_overview(session.tutorial());
    print_step(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("n") => {
                session.advance().await;
            }
            Some("p") => {
                session.retreat().await;
            }
            Some("j") => match words.next().map(str::parse::<u32>) {
                Some(Ok(target)) => {
                    if let Err(err) = session.jump(target).await {
                        println!("{err}");
                        continue;
                    }
                }
                _ => {
                    println!("pakai: j <nomor langkah>");
                    continue;
                }
            },
            Some("c") => {
                if session.mark_complete().await.completed_now {
                    println!();
                    println!("Selamat! Tutorial Selesai!");
                }
            }
            Some("q") => break,
            Some(other) => {
                println!("perintah tidak dikenal: {other}");
                continue;
            }
            None => {}
        }
        print_step(&session);
    }

    let report = session.close().await;
    println!("Waktu belajar: {}", format_secs(report.time.display_secs));
    if report.time.dropped_secs > 0 {
        println!(
            "({} detik belum tersimpan di server)",
            report.time.dropped_secs
        );
    }
    Ok(())
}

// ─── Account ─────────────────────────────────────────────────────────────────

fn report_auth_error(err: &AuthError) {
    match err {
        AuthError::Validation(errors) => {
            for (field, message) in errors.iter() {
                eprintln!("  {field}: {message}");
            }
        }
        AuthError::Rejected { field, message } => eprintln!("  {field}: {message}"),
        other => eprintln!("  {other}"),
    }
}

pub async fn login(services: &AppServices, draft: LoginDraft) -> CommandResult {
    match services.session().login(draft).await {
        Ok(user) => {
            println!("Selamat datang, {}!", user.display_name());
            Ok(())
        }
        Err(err) => {
            eprintln!("Login gagal");
            report_auth_error(&err);
            Err(err.into())
        }
    }
}

pub async fn register(services: &AppServices, draft: RegistrationDraft) -> CommandResult {
    match services.session().register(draft).await {
        Ok(user) => {
            println!("Registrasi berhasil. Selamat datang, {}!", user.display_name());
            Ok(())
        }
        Err(err) => {
            eprintln!("Registrasi gagal");
            report_auth_error(&err);
            Err(err.into())
        }
    }
}

pub async fn logout(services: &AppServices) -> CommandResult {
    services.session().logout().await;
    println!("Berhasil keluar.");
    Ok(())
}

fn print_profile(user: &UserProfile) {
    println!("{} (@{})", user.display_name(), user.username);
    println!("{}", user.email);
    if let Some(name) = &user.karang_taruna_name {
        println!("Karang Taruna: {name}");
    }
    if let Some(address) = &user.address {
        println!(
            "{}, {}, {}, {}",
            address.jalan, address.kecamatan, address.kabupaten_kota, address.provinsi
        );
    }
}

pub async fn whoami(services: &AppServices) -> CommandResult {
    let Some(cached) = services.session().current_user() else {
        println!("Belum masuk.");
        return Ok(());
    };
    match services.session().refresh().await {
        Ok(user) => print_profile(&user),
        Err(err) => {
            tracing::warn!(error = %err, "profile refresh failed; showing stored profile");
            print_profile(&cached);
        }
    }
    Ok(())
}

// ─── My Learning ─────────────────────────────────────────────────────────────

fn print_card(card: &LearningCard) {
    println!("{:<26} {}", card.tutorial_id.as_str(), card.title);
    if card.is_completed {
        println!("    {} | Tutorial Selesai", card.category);
    } else {
        println!(
            "    {} | {} | {} dari {} langkah selesai",
            card.category,
            progress_bar(card.percentage),
            card.completed_count,
            card.total_steps
        );
    }
}

pub async fn my_learning(services: &AppServices) -> CommandResult {
    let user = services.session().require_user()?;
    let overview = services.my_learning().overview(&user).await?;
    if overview.is_empty() {
        println!("Belum Ada Tutorial");
        return Ok(());
    }
    println!("Sedang Dipelajari ({})", overview.ongoing.len());
    overview.ongoing.iter().for_each(print_card);
    println!();
    println!("Selesai ({})", overview.completed.len());
    overview.completed.iter().for_each(print_card);
    Ok(())
}

// ─── Settings ────────────────────────────────────────────────────────────────

pub async fn theme(services: &AppServices, action: ThemeAction) -> CommandResult {
    let settings = services.settings();
    let theme = match action {
        ThemeAction::Show => settings.theme().await,
        ThemeAction::Toggle => settings.toggle_theme().await?,
        ThemeAction::Set(theme) => settings.set_theme(theme).await?,
    };
    println!("{theme}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_elapsed_time() {
        assert_eq!(format_secs(0), "00:00");
        assert_eq!(format_secs(125), "02:05");
        assert_eq!(format_secs(3725), "1:02:05");
    }

    #[test]
    fn progress_bar_fills_by_tens() {
        assert_eq!(progress_bar(0), "[..........]   0%");
        assert_eq!(progress_bar(33), "[###.......]  33%");
        assert_eq!(progress_bar(100), "[##########] 100%");
    }
}
