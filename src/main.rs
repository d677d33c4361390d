use std::collections::HashMap;
use std::error::Error;
use std::io::{self, prelude::*};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use enum_iterator::all;
use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use threebaskets_rs::games::baskets::{
    Basket, Coin, GameState, Outcome, Role, Solver, Table, DEFAULT_COINS, MAX_COINS, MIN_COINS,
};

#[derive(Debug, Parser)]
#[command(name = "threebaskets", about = "Play and solve the three baskets coin game")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play one game against the solver
    Play {
        #[arg(long, default_value_t = DEFAULT_COINS, value_parser = clap::value_parser!(u8).range(MIN_COINS as i64..=MAX_COINS as i64))]
        coins: u8,
        /// Which side you take
        #[arg(long, value_enum, default_value_t = Seat::Presenter)]
        role: Seat,
        /// Pause between an offer and its placement
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,
    },
    /// Play computer games and count wins per role
    Simulate {
        #[arg(long, default_value_t = DEFAULT_COINS, value_parser = clap::value_parser!(u8).range(MIN_COINS as i64..=MAX_COINS as i64))]
        coins: u8,
        #[arg(long, default_value_t = 1000)]
        games: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, value_enum, default_value_t = PresenterKind::Random)]
        presenter: PresenterKind,
    },
    /// Report the forced-win verdict for each opening offer
    Solve {
        /// Coin count to solve; every supported count when omitted
        #[arg(long, value_parser = clap::value_parser!(u8).range(MIN_COINS as i64..=MAX_COINS as i64))]
        coins: Option<u8>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Seat {
    Presenter,
    Placer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PresenterKind {
    Random,
    Solver,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Play {
            coins,
            role,
            delay_ms,
        } => play(coins, role, Duration::from_millis(delay_ms)),
        Command::Simulate {
            coins,
            games,
            seed,
            presenter,
        } => simulate(coins, games, seed, presenter),
        Command::Solve { coins } => solve(coins),
    }
}

trait OfferMaker {
    fn get_offer(&mut self, state: &GameState) -> Result<Basket, Box<dyn Error>>;
    fn get_name(&self) -> &str;
}

trait CoinPicker {
    fn get_coin(&mut self, state: &GameState, basket: Basket) -> Result<Coin, Box<dyn Error>>;
    fn get_name(&self) -> &str;
}

struct RandomOffer {
    rng: StdRng,
}

struct SolverOffer {
    solver: Solver,
}

struct SolverCoin {
    solver: Solver,
}

struct HumanOffer {}

struct HumanCoin {}

impl OfferMaker for RandomOffer {
    fn get_offer(&mut self, _state: &GameState) -> Result<Basket, Box<dyn Error>> {
        Ok(Basket::from_index(self.rng.gen_range(0..3))?)
    }

    fn get_name(&self) -> &str {
        "random"
    }
}

impl OfferMaker for SolverOffer {
    fn get_offer(&mut self, state: &GameState) -> Result<Basket, Box<dyn Error>> {
        Ok(self.solver.choose_offer(state)?)
    }

    fn get_name(&self) -> &str {
        "solver"
    }
}

impl CoinPicker for SolverCoin {
    fn get_coin(&mut self, state: &GameState, basket: Basket) -> Result<Coin, Box<dyn Error>> {
        Ok(self.solver.choose_coin(state, basket)?)
    }

    fn get_name(&self) -> &str {
        "solver"
    }
}

impl OfferMaker for HumanOffer {
    fn get_offer(&mut self, state: &GameState) -> Result<Basket, Box<dyn Error>> {
        loop {
            let answer = prompt("Offer a basket (0, 1 or 2): ")?;
            match answer
                .parse::<usize>()
                .map_err(|err| err.to_string())
                .and_then(|index| Basket::from_index(index).map_err(|err| err.to_string()))
                .and_then(|basket| {
                    state
                        .apply_offer(basket)
                        .map(|_| basket)
                        .map_err(|err| err.to_string())
                }) {
                Ok(basket) => return Ok(basket),
                Err(err) => {
                    warn!("rejected offer {:?}: {}", answer, err);
                    println!("{}", err.red());
                }
            }
        }
    }

    fn get_name(&self) -> &str {
        "you"
    }
}

impl CoinPicker for HumanCoin {
    fn get_coin(&mut self, state: &GameState, basket: Basket) -> Result<Coin, Box<dyn Error>> {
        loop {
            let answer = prompt(&format!("Coin for basket {}: ", basket))?;
            match answer
                .parse::<Coin>()
                .map_err(|err| err.to_string())
                .and_then(|coin| {
                    state
                        .apply_placement(basket, coin)
                        .map(|_| coin)
                        .map_err(|err| err.to_string())
                }) {
                Ok(coin) => return Ok(coin),
                Err(err) => {
                    warn!("rejected coin {:?}: {}", answer, err);
                    println!("{}", err.red());
                }
            }
        }
    }

    fn get_name(&self) -> &str {
        "you"
    }
}

fn prompt(message: &str) -> io::Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(line.trim().to_string())
}

fn render(table: &Table) {
    let state = table.state();
    for basket in all::<Basket>() {
        let coins: Vec<String> = table
            .history()
            .iter()
            .filter(|placement| placement.basket == basket)
            .map(|placement| placement.coin.to_string())
            .collect();
        let label = format!("basket {}: {:>2}", basket, state.sum(basket));
        let label = if state.offer() == Some(basket) {
            label.yellow().bold()
        } else {
            label.normal()
        };
        println!("  {}  [{}]", label, coins.join(" "));
    }
    let coins: Vec<String> = state.remaining().iter().map(|c| c.to_string()).collect();
    println!("  coins left: {}", coins.join(" ").cyan());
}

fn play_game(
    table: &mut Table,
    presenter: &mut dyn OfferMaker,
    placer: &mut dyn CoinPicker,
    delay: Duration,
    show: bool,
) -> Result<Outcome, Box<dyn Error>> {
    table.start();
    while !table.state().is_terminal() {
        if show {
            render(table);
        }
        let basket = presenter.get_offer(table.state())?;
        table.offer(basket)?;
        if show {
            println!("{} offered basket {}", presenter.get_name(), basket);
            thread::sleep(delay);
        }
        let coin = placer.get_coin(table.state(), basket)?;
        table.place(basket, coin)?;
        if show {
            println!("{} placed coin {}", placer.get_name(), coin);
        }
    }
    if show {
        render(table);
    }
    Ok(table.outcome()?)
}

fn play(coins: u8, seat: Seat, delay: Duration) -> Result<(), Box<dyn Error>> {
    let mut table = Table::new(coins)?;
    let outcome = match seat {
        Seat::Presenter => play_game(
            &mut table,
            &mut HumanOffer {},
            &mut SolverCoin {
                solver: Solver::new(),
            },
            delay,
            true,
        )?,
        Seat::Placer => play_game(
            &mut table,
            &mut SolverOffer {
                solver: Solver::new(),
            },
            &mut HumanCoin {},
            delay,
            true,
        )?,
    };
    let you_won = match seat {
        Seat::Presenter => outcome.winner == Role::Presenter,
        Seat::Placer => outcome.winner == Role::Placer,
    };
    let summary = format!(
        "{} wins with {} against {}",
        outcome.winner, outcome.top_sum, outcome.second_sum
    );
    if you_won {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
    Ok(())
}

fn simulate(
    coins: u8,
    games: usize,
    seed: u64,
    presenter_kind: PresenterKind,
) -> Result<(), Box<dyn Error>> {
    let mut presenter: Box<dyn OfferMaker> = match presenter_kind {
        PresenterKind::Random => Box::new(RandomOffer {
            rng: StdRng::seed_from_u64(seed),
        }),
        PresenterKind::Solver => Box::new(SolverOffer {
            solver: Solver::new(),
        }),
    };
    // One solving session for the whole run; the cache stays valid across
    // games with the same coin count.
    let mut placer = SolverCoin {
        solver: Solver::new(),
    };
    let mut wins: HashMap<Role, usize> = HashMap::new();
    let mut table = Table::new(coins)?;
    let start = Instant::now();
    for _ in 0..games {
        table.reset();
        let outcome = play_game(
            &mut table,
            presenter.as_mut(),
            &mut placer,
            Duration::ZERO,
            false,
        )?;
        *wins.entry(outcome.winner).or_insert(0) += 1;
    }
    let duration = start.elapsed();
    info!("placer solver cache: {:?}", placer.solver.stats());

    println!(
        "{} games with {} coins, {} presenter vs {} placer",
        games,
        coins,
        presenter.get_name(),
        placer.get_name()
    );
    for role in all::<Role>() {
        println!("  {:>9}: {}", role.to_string(), wins.get(&role).unwrap_or(&0));
    }
    println!("Time elapsed: {:?}", duration);
    Ok(())
}

fn solve(coins: Option<u8>) -> Result<(), Box<dyn Error>> {
    let counts: Vec<u8> = match coins {
        Some(count) => vec![count],
        None => (MIN_COINS..=MAX_COINS).collect(),
    };
    for count in counts {
        let mut solver = Solver::new();
        let opening = GameState::with_coin_count(count)?;
        let start = Instant::now();
        for basket in all::<Basket>() {
            let verdict = solver.can_force_win(&opening, basket)?;
            let coin = solver.choose_coin(&opening, basket)?;
            let forcing = solver.forcing_coins(&opening, basket)?;
            let verdict = if verdict {
                "placer forces a win".green()
            } else {
                "presenter can hold a tie".red()
            };
            println!(
                "{:>2} coins, basket {}: {} (plays {}, forcing {:?})",
                count, basket, verdict, coin, forcing
            );
        }
        let stats = solver.stats();
        println!(
            "   {} positions cached, {} hits, {:?}",
            stats.entries,
            stats.hits,
            start.elapsed()
        );
    }
    Ok(())
}
