use std::thread;

use rand::{rngs::StdRng, Rng, SeedableRng};
use threebaskets_rs::games::baskets::{Basket, SharedTable, Solver, Table};

// The presenter offers from its own thread, the solver places from the main
// thread, both through one shared table.
fn main() {
    let mut table = Table::new(6).expect("six coins are supported");
    table.start();
    let shared = SharedTable::new(table);

    let presenter = {
        let shared = shared.clone();
        thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(7);
            let mut offers = 0;
            while !shared.snapshot().state().is_terminal() {
                let basket = Basket::from_index(rng.gen_range(0..3)).expect("index in range");
                // Rejected while the previous offer is still waiting for a coin
                if shared.offer(basket).is_ok() {
                    offers += 1;
                }
                thread::yield_now();
            }
            offers
        })
    };

    let mut solver = Solver::new();
    loop {
        let table = shared.snapshot();
        let state = table.state();
        if state.is_terminal() {
            break;
        }
        let Some(basket) = state.offer() else {
            thread::yield_now();
            continue;
        };
        let coin = solver.choose_coin(state, basket).expect("coin chosen");
        shared.place(basket, coin).expect("placement accepted");
        println!("state: {}", shared.snapshot().state());
        println!("record: {:?}", shared.snapshot().to_record().to_json());
    }

    let offers = presenter.join().expect("presenter thread finished");
    let table = shared.snapshot();
    println!("offers accepted: {}", offers);
    println!("history: {:?}", table.history());
    println!("outcome: {:?}", table.outcome());
    println!("cache: {:?}", solver.stats());
}
