use crate::infra::{in_memory_board_service, BoardService};
use clap::Args;
use jobtrack::board::{
    BoardServiceError, BoardView, ColumnId, JobApplication, NewJobApplication, UserId,
};
use jobtrack::config::AppConfig;
use jobtrack::error::AppError;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Identity that owns the demo board
    #[arg(long, default_value = "demo-user")]
    pub(crate) user: String,
    /// Print the final board as JSON instead of a column listing
    #[arg(long)]
    pub(crate) json: bool,
}

const DEMO_COMPANIES: [&str; 4] = ["Acme", "Globex", "Initech", "Hooli"];

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = in_memory_board_service(config.board);
    let user = UserId::new(args.user);

    let board = service.init_user_board(&user)?;
    println!("Job board demo for {user} ({})", board.name);

    let view = load_board(&service, &user)?;
    let applied = column_id(&view, "Applied")?;
    let interviewing = column_id(&view, "Interviewing")?;

    let mut created = Vec::with_capacity(DEMO_COMPANIES.len());
    for company in DEMO_COMPANIES {
        let record = service.create_job_application(
            &user,
            NewJobApplication {
                board_id: view.id,
                column_id: applied,
                company: company.to_string(),
                position: "Software Engineer".to_string(),
                location: Some("Remote".to_string()),
                notes: None,
                salary: None,
                job_url: None,
                tags: vec!["demo".to_string()],
                description: None,
            },
        )?;
        created.push(record);
    }
    render(
        "After creating four applications",
        &load_board(&service, &user)?,
    );

    let hooli = find(&created, "Hooli")?;
    service.move_job_application(&user, hooli.id, interviewing, Some(0))?;
    let globex = find(&created, "Globex")?;
    service.move_job_application(&user, globex.id, interviewing, None)?;
    render(
        "After Hooli and Globex advance to Interviewing",
        &load_board(&service, &user)?,
    );

    let initech = find(&created, "Initech")?;
    service.move_job_application(&user, initech.id, applied, Some(0))?;
    let view = load_board(&service, &user)?;
    render("After Initech jumps to the top of Applied", &view);

    if args.json {
        match serde_json::to_string_pretty(&view) {
            Ok(json) => println!("\n{json}"),
            Err(err) => println!("\nBoard payload unavailable: {err}"),
        }
    }

    Ok(())
}

fn load_board(service: &BoardService, user: &UserId) -> Result<BoardView, AppError> {
    service
        .get_user_board(user)?
        .ok_or(AppError::Board(BoardServiceError::BoardNotFound))
}

fn column_id(view: &BoardView, name: &str) -> Result<ColumnId, AppError> {
    view.column_named(name)
        .map(|column| column.id)
        .ok_or(AppError::Board(BoardServiceError::ColumnNotFound))
}

fn find<'a>(records: &'a [JobApplication], company: &str) -> Result<&'a JobApplication, AppError> {
    records
        .iter()
        .find(|record| record.company == company)
        .ok_or(AppError::Board(BoardServiceError::JobApplicationNotFound))
}

fn render(title: &str, view: &BoardView) {
    println!("\n{title}");
    for column in &view.columns {
        if column.job_applications.is_empty() {
            println!("- {}: (empty)", column.name);
            continue;
        }
        let cards: Vec<String> = column
            .job_applications
            .iter()
            .map(|card| format!("{}@{}", card.company, card.order))
            .collect();
        println!("- {}: {}", column.name, cards.join(", "));
    }
}
