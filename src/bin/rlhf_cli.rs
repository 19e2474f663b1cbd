//! One-shot calculator over the `rlhf_viz` formulas.
//!
//! Examples:
//!   rlhf-cli gae
//!   rlhf-cli gae --reward 1.0 --gamma 1 --lambda 1
//!   rlhf-cli logprob --logits 2.1,8.5,1.2,0.8,3.2 --target 1
//!   rlhf-cli pad --ids 11,12,13,14,15 --block 8
//!   rlhf-cli filter --prompt-len 10 --chosen-len 5 --rejected-len 4 --block 14
//!   rlhf-cli ppo --old -1.0 --new -0.6 --adv 1.0 --ret 1.2 --value 0.9
//!   rlhf-cli reward --steps 20 --lr 0.5
//!
//! Every command prints one JSON document on stdout. `--pretty` indents it.

use serde::Serialize;
use hashbrown::HashMap;
use std::process;

use rlhf_viz::gae::{self, demo as gae_demo, GaeParams, GaeStep};
use rlhf_viz::logprob::TokenPrediction;
use rlhf_viz::padding::{fits_block, keep_pair, pad_tokens, Padded, EOT_ID};
use rlhf_viz::ppo::{token_loss, PpoHyperparams, TokenLoss, TokenLossInput};
use rlhf_viz::reward_model::{demo as reward_demo, PairwiseOutcome, RewardPair, RewardTrainer, EMBED_DIM};

fn usage() -> ! {
    eprintln!("rlhf-cli: evaluate one RLHF formula and print the result as JSON");
    eprintln!("Usage: rlhf-cli <command> [--flag value ...] [--pretty]\n");
    eprintln!("Commands:");
    eprintln!("  gae      [--policy L] [--ref L] [--values L] [--reward R] [--beta B] [--gamma G] [--lambda L]");
    eprintln!("           KL-penalized scores and GAE (defaults: the \"Where is Pune?\" example)");
    eprintln!("  logprob  --logits L --target I       Softmax and the target's log-prob");
    eprintln!("  pad      --ids L --block N [--pad-id ID]  Pad/truncate to the block and build the mask");
    eprintln!("  filter   --prompt-len P --chosen-len C --rejected-len R --block N");
    eprintln!("           Reward-dataset length filter");
    eprintln!("  ppo      --old X --new X --adv A --ret R --value V [--target T]");
    eprintln!("           [--clip-eps E] [--value-coef C] [--entropy-coef C] [--value-clip on|off] [--value-clip-range R]");
    eprintln!("  reward   [--prompt S] [--chosen S] [--rejected S] [--block N] [--lr X] [--steps N]");
    eprintln!("           Train the toy reward head on one pair");
    eprintln!("\nLists (L) are comma-separated numbers.");
    process::exit(1);
}

fn make_error(msg: &str) -> ! {
    eprintln!("{msg}");
    process::exit(1);
}

struct Flags {
    values: HashMap<String, String>,
    pretty: bool,
}

impl Flags {
    fn parse(args: &[String]) -> Self {
        let mut values = HashMap::new();
        let mut pretty = false;
        let mut it = args.iter();
        while let Some(arg) = it.next() {
            if arg == "--pretty" {
                pretty = true;
                continue;
            }
            let Some(key) = arg.strip_prefix("--") else {
                make_error(&format!("unexpected argument `{arg}`"));
            };
            let Some(value) = it.next() else {
                make_error(&format!("--{key} needs a value"));
            };
            values.insert(key.to_string(), value.clone());
        }
        Self { values, pretty }
    }

    fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn text(&self, key: &str, default: &str) -> String {
        self.raw(key).unwrap_or(default).to_string()
    }

    fn num<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.raw(key).map(|raw| {
            raw.parse()
                .unwrap_or_else(|_| make_error(&format!("--{key}: `{raw}` is not a number")))
        })
    }

    fn num_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.num(key).unwrap_or(default)
    }

    fn required<T: std::str::FromStr>(&self, key: &str) -> T {
        self.num(key).unwrap_or_else(|| make_error(&format!("--{key} is required")))
    }

    fn list<T: std::str::FromStr>(&self, key: &str) -> Option<Vec<T>> {
        self.raw(key).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse()
                        .unwrap_or_else(|_| make_error(&format!("--{key}: `{s}` is not a number")))
                })
                .collect()
        })
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.raw(key) {
            None => default,
            Some("1" | "true" | "on" | "yes") => true,
            Some("0" | "false" | "off" | "no") => false,
            Some(other) => make_error(&format!("--{key} must be on|off, got `{other}`")),
        }
    }
}

#[derive(Serialize)]
struct GaeOutput {
    kl: Vec<f64>,
    scores: Vec<f64>,
    advantages: Vec<f64>,
    returns: Vec<f64>,
    trace: Vec<GaeStep>,
}

#[derive(Serialize)]
struct PadOutput {
    block_size: usize,
    active: usize,
    #[serde(flatten)]
    padded: Padded,
}

#[derive(Serialize)]
struct FilterOutput {
    chosen_fits: bool,
    rejected_fits: bool,
    kept: bool,
}

#[derive(Serialize)]
struct PpoOutput {
    hyperparams: PpoHyperparams,
    #[serde(flatten)]
    loss: TokenLoss,
}

#[derive(Serialize)]
struct RewardStep {
    step: u64,
    #[serde(flatten)]
    outcome: PairwiseOutcome,
}

#[derive(Serialize)]
struct RewardOutput {
    pair: RewardPair,
    history: Vec<RewardStep>,
    weights: Vec<f64>,
    after: PairwiseOutcome,
}

fn run_gae(flags: &Flags) -> rlhf_viz::Result<GaeOutput> {
    let policy = flags.list("policy").unwrap_or_else(|| gae_demo::POLICY_LOG_PROBS.to_vec());
    let reference = flags.list("ref").unwrap_or_else(|| gae_demo::REF_LOG_PROBS.to_vec());
    let values = flags.list("values").unwrap_or_else(|| gae_demo::VALUES.to_vec());
    let reward = flags.num_or("reward", gae_demo::REWARD);
    let beta = flags.num_or("beta", gae_demo::KL_BETA);
    let params = GaeParams {
        gamma: flags.num_or("gamma", gae_demo::GAMMA),
        lambda: flags.num_or("lambda", gae_demo::LAMBDA),
    };

    let kl = gae::kl_divergence(&policy, &reference)?;
    let scores = gae::kl_penalized_scores(&policy, &reference, beta, reward)?;
    let trace = gae::gae_trace(&scores, &values, params)?;
    let result = gae::compute_gae(&scores, &values, params)?;
    Ok(GaeOutput {
        kl,
        scores,
        advantages: result.advantages,
        returns: result.returns,
        trace,
    })
}

fn run_ppo(flags: &Flags) -> PpoOutput {
    let defaults = PpoHyperparams::default();
    let hyperparams = PpoHyperparams {
        clip_eps: flags.num_or("clip-eps", defaults.clip_eps),
        value_coef: flags.num_or("value-coef", defaults.value_coef),
        entropy_coef: flags.num_or("entropy-coef", defaults.entropy_coef),
        use_value_clip: flags.flag("value-clip", defaults.use_value_clip),
        value_clip_range: flags.num_or("value-clip-range", defaults.value_clip_range),
    };
    let input = TokenLossInput {
        old_log_prob: flags.required("old"),
        new_log_prob: flags.required("new"),
        advantage: flags.required("adv"),
        ret: flags.required("ret"),
        value: flags.required("value"),
        target_value: flags.num("target"),
    };
    PpoOutput {
        hyperparams,
        loss: token_loss(&input, &hyperparams),
    }
}

fn run_reward(flags: &Flags) -> rlhf_viz::Result<RewardOutput> {
    let pair = RewardPair::build(
        &flags.text("prompt", reward_demo::PROMPT),
        &flags.text("chosen", reward_demo::CHOSEN),
        &flags.text("rejected", reward_demo::REJECTED),
        flags.num_or("block", 48),
    );
    let chosen = pair.chosen.pooled(EMBED_DIM)?.rep;
    let rejected = pair.rejected.pooled(EMBED_DIM)?.rep;

    let mut trainer = RewardTrainer::new(EMBED_DIM, flags.num_or("lr", 0.5));
    let steps: u64 = flags.num_or("steps", 10);
    let mut history = Vec::new();
    for _ in 0..steps {
        let step = trainer.steps;
        let outcome = trainer.step(&chosen, &rejected)?;
        history.push(RewardStep { step, outcome });
    }
    let after = trainer.evaluate(&chosen, &rejected)?;
    Ok(RewardOutput {
        pair,
        history,
        weights: trainer.head.weights,
        after,
    })
}

fn print_json(value: &impl Serialize, pretty: bool) {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match out {
        Ok(line) => println!("{line}"),
        Err(e) => make_error(&format!("serialize: {e}")),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(cmd) = args.first() else {
        usage();
    };
    if cmd == "--help" || cmd == "-h" || cmd == "help" {
        usage();
    }
    let flags = Flags::parse(&args[1..]);
    let pretty = flags.pretty;

    let fail = |e: rlhf_viz::RlhfError| -> ! { make_error(&format!("{cmd}: {e}")) };

    match cmd.as_str() {
        "gae" => print_json(&run_gae(&flags).unwrap_or_else(|e| fail(e)), pretty),
        "logprob" => {
            let logits: Vec<f64> = flags
                .list("logits")
                .unwrap_or_else(|| make_error("--logits is required"));
            let target: usize = flags.required("target");
            let pred = TokenPrediction::new(&logits, target).unwrap_or_else(|e| fail(e));
            print_json(&pred, pretty);
        }
        "pad" => {
            let ids: Vec<u32> = flags.list("ids").unwrap_or_else(|| make_error("--ids is required"));
            let block_size: usize = flags.required("block");
            let padded = pad_tokens(&ids, block_size, flags.num_or("pad-id", EOT_ID));
            print_json(
                &PadOutput {
                    block_size,
                    active: padded.active_count(),
                    padded,
                },
                pretty,
            );
        }
        "filter" => {
            let prompt: usize = flags.required("prompt-len");
            let chosen: usize = flags.required("chosen-len");
            let rejected: usize = flags.required("rejected-len");
            let block: usize = flags.required("block");
            print_json(
                &FilterOutput {
                    chosen_fits: fits_block(prompt, chosen, block),
                    rejected_fits: fits_block(prompt, rejected, block),
                    kept: keep_pair(prompt, chosen, rejected, block),
                },
                pretty,
            );
        }
        "ppo" => print_json(&run_ppo(&flags), pretty),
        "reward" => print_json(&run_reward(&flags).unwrap_or_else(|e| fail(e)), pretty),
        _ => usage(),
    }
}
