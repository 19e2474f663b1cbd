use rlhf_viz::gae::{self, demo as gae_demo, GaeParams};
use rlhf_viz::logprob::TokenPrediction;
use rlhf_viz::padding::{action_mask, keep_pair, pad_tokens, EOT_ID};
use rlhf_viz::ppo::{token_loss, PpoHyperparams, TokenLossInput};
use rlhf_viz::reward_model::{demo as reward_demo, RewardPair, RewardTrainer, EMBED_DIM};
use rlhf_viz::tokens::{demo as token_demo, shift_for_next_token};
use rlhf_viz::Result;

const SECTIONS: &[(&str, fn() -> Result<()>)] = &[
    ("tokens", run_tokens),
    ("logprob", run_logprob),
    ("gae", run_gae),
    ("padding", run_padding),
    ("reward", run_reward),
    ("ppo", run_ppo),
];

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h" || args[1] == "help") {
        print_help();
        return;
    }

    let selected: Vec<_> = if args.len() >= 2 {
        match SECTIONS.iter().find(|(name, _)| *name == args[1]) {
            Some(section) => vec![section],
            None => {
                eprintln!("Unknown section: {}", args[1]);
                print_help();
                std::process::exit(2);
            }
        }
    } else {
        SECTIONS.iter().collect()
    };

    for (name, run) in selected {
        println!("== {name} ==");
        if let Err(e) = run() {
            eprintln!("{name}: {e}");
            std::process::exit(1);
        }
        println!();
    }
}

fn print_help() {
    println!("rlhf_viz (RLHF arithmetic, one worked example per stage)");
    println!("usage:");
    println!("  cargo run");
    for (name, _) in SECTIONS {
        println!("  cargo run -- {name}");
    }
    println!("  cargo run -- --help");
}

fn fmt_row(values: &[f64]) -> String {
    let cells: Vec<String> = values.iter().map(|v| format!("{v:>7.4}")).collect();
    format!("[{}]", cells.join(", "))
}

fn run_tokens() -> Result<()> {
    let seq = token_demo::sequence();
    let texts = seq.texts();
    let (inputs, targets) = shift_for_next_token(&texts);
    println!("sequence: {:?}", texts.concat());
    println!("prompt tokens: {}, generated: {}", seq.prompt_len(), seq.len() - seq.prompt_len());
    for (i, (input, target)) in inputs.iter().zip(targets).enumerate() {
        println!("  {i}: {input:?} -> {target:?}");
    }
    Ok(())
}

fn run_logprob() -> Result<()> {
    let logits = [2.1, 8.5, 1.2, 0.8, 3.2];
    let pred = TokenPrediction::new(&logits, 1)?;
    println!("logits: {}", fmt_row(&pred.logits));
    println!("probs:  {}", fmt_row(&pred.probs));
    println!(
        "target {} -> p = {:.6}, log p = {:.6}",
        pred.target, pred.target_prob, pred.log_prob
    );
    Ok(())
}

fn run_gae() -> Result<()> {
    let scores = gae::kl_penalized_scores(
        gae_demo::POLICY_LOG_PROBS,
        gae_demo::REF_LOG_PROBS,
        gae_demo::KL_BETA,
        gae_demo::REWARD,
    )?;
    let params = GaeParams {
        gamma: gae_demo::GAMMA,
        lambda: gae_demo::LAMBDA,
    };
    println!("scores: {}", fmt_row(&scores));
    println!("values: {}", fmt_row(gae_demo::VALUES));
    println!("   t   score   value  next_v   delta     adv     ret");
    for step in gae::gae_trace(&scores, gae_demo::VALUES, params)? {
        println!(
            "{:>4} {:>7.4} {:>7.4} {:>7.4} {:>7.4} {:>7.4} {:>7.4}",
            step.t, step.score, step.value, step.next_value, step.delta, step.advantage, step.ret
        );
    }
    Ok(())
}

fn run_padding() -> Result<()> {
    let ids = token_demo::COMPLETION_IDS;
    for block in [16, 8] {
        let padded = pad_tokens(ids, block, EOT_ID);
        println!(
            "block {block:>2}: truncated={} active={} ids={:?}",
            padded.truncated,
            padded.active_count(),
            padded.ids
        );
    }
    let mask = action_mask(token_demo::PROMPT.len(), token_demo::RESPONSE.len(), 16);
    let bits: String = mask.iter().map(|&m| if m { '1' } else { '0' }).collect();
    println!("action mask: {bits}");
    println!("pair filter 10+5, block 14: {}", keep_pair(10, 5, 5, 14));
    println!("pair filter 10+5, block 13: {}", keep_pair(10, 5, 5, 13));
    Ok(())
}

fn run_reward() -> Result<()> {
    let pair = RewardPair::build(reward_demo::PROMPT, reward_demo::CHOSEN, reward_demo::REJECTED, 48);
    let chosen = pair.chosen.pooled(EMBED_DIM)?.rep;
    let rejected = pair.rejected.pooled(EMBED_DIM)?.rep;
    println!(
        "prompt {} ids, chosen {} ids, rejected {} ids, kept={}",
        pair.prompt_len(),
        pair.chosen.response_len,
        pair.rejected.response_len,
        pair.kept
    );

    let mut trainer = RewardTrainer::new(EMBED_DIM, 0.5);
    println!("step    loss  margin  acc");
    for _ in 0..10 {
        let step = trainer.steps;
        let outcome = trainer.step(&chosen, &rejected)?;
        println!("{step:>4} {:>7.4} {:>7.4} {:>4}", outcome.loss, outcome.margin, outcome.accuracy);
    }
    println!("weights: {}", fmt_row(&trainer.head.weights));
    Ok(())
}

fn run_ppo() -> Result<()> {
    let hp = PpoHyperparams::default();
    for (ratio, advantage) in [(1.5, 1.0), (1.5, -1.0), (0.7, 1.0), (1.05, 0.4)] {
        let loss = token_loss(
            &TokenLossInput {
                old_log_prob: 0.0,
                new_log_prob: f64::ln(ratio),
                advantage,
                ret: 1.0,
                value: 0.9,
                target_value: Some(1.0),
            },
            &hp,
        );
        println!(
            "ratio {:.2} A {:+.2}: unclipped {:+.4} clipped {:+.4} ppo {:+.4} value {:.4} total {:+.4}",
            loss.ratio, advantage, loss.unclipped, loss.clipped, loss.ppo_loss, loss.value_loss, loss.total
        );
    }
    Ok(())
}
