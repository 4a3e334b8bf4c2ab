//! 対話メニュー

use crate::cli::RunMode;
use crate::error::{BomError, Result};
use crate::runner::Session;
use dialoguer::Select;

const EXIT_LABEL: &str = "0. 終了";

/// メニュー項目（0: 終了、1-4: モード）
pub fn menu_items() -> Vec<String> {
    std::iter::once(EXIT_LABEL.to_string())
        .chain(RunMode::ALL.iter().map(|m| m.to_string()))
        .collect()
}

/// 選択番号をモードに変換（0は終了）
pub fn mode_for_choice(choice: usize) -> Option<RunMode> {
    choice
        .checked_sub(1)
        .and_then(|i| RunMode::ALL.get(i))
        .copied()
}

/// 終了を選ぶか「すべて実行」が終わるまで繰り返す
pub fn run_interactive(session: &Session) -> Result<()> {
    let items = menu_items();

    loop {
        let choice = Select::new()
            .with_prompt("実行する処理を選択 (0-4)")
            .items(&items)
            .default(RunMode::All.number() as usize)
            .interact()
            .map_err(|e| BomError::Prompt(e.to_string()))?;

        let Some(mode) = mode_for_choice(choice) else {
            println!("終了します");
            break;
        };

        println!();
        session.run(mode)?;

        if mode == RunMode::All {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_items() {
        let items = menu_items();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], "0. 終了");
        assert!(items[4].starts_with("4. "));
    }

    #[test]
    fn test_mode_for_choice() {
        assert_eq!(mode_for_choice(0), None);
        assert_eq!(mode_for_choice(1), Some(RunMode::Json));
        assert_eq!(mode_for_choice(4), Some(RunMode::All));
        assert_eq!(mode_for_choice(5), None);
    }
}
