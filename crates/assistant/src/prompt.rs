//! Prompt builders: the Japanese system prompts sent to the model, the
//! sheet-state analysis they embed, and the deterministic fallback
//! questions used when the model cannot be reached.

use bridgesheet_engine::document::SheetDocument;
use bridgesheet_engine::node::FieldForm;

pub const GREETING: &str = "こんにちは！ BRIDGE AIアシスタントです。先生と司書をつなぐお手伝いをします。\n\n授業についていくつか質問させてください。";

pub const FALLBACK_FIRST_QUESTION: &str = "まず、何年生向けの授業を考えていますか？";

pub const FALLBACK_DONE: &str = "他に追加・修正したい情報があれば教えてください。";

/// Snapshot of which fields are filled and which priority fields still
/// need asking. Drives both prompt context and the fallback questions.
#[derive(Debug, Clone, Default)]
pub struct SheetAnalysis {
    pub total_fields: usize,
    pub filled: Vec<FilledField>,
    pub empty_priority: Vec<PendingField>,
}

#[derive(Debug, Clone)]
pub struct FilledField {
    pub id: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct PendingField {
    pub id: String,
    pub name: String,
    pub options: String,
}

impl SheetAnalysis {
    pub fn filled_count(&self) -> usize {
        self.filled.len()
    }

    /// True when the sheet still has something worth asking about.
    pub fn needs_hearing(&self) -> bool {
        !self.empty_priority.is_empty() || self.filled_count() < self.total_fields
    }
}

pub fn analyze(doc: &SheetDocument) -> SheetAnalysis {
    let mut analysis = SheetAnalysis::default();
    for handle in doc.terminal_fields() {
        let node = match doc.node(handle) {
            Some(node) => node,
            None => continue,
        };
        let form = match node.kind.form() {
            Some(form) => form,
            None => continue,
        };
        analysis.total_fields += 1;
        if form.has_answer() {
            analysis.filled.push(FilledField {
                id: node.code().to_string(),
                name: node.name.clone(),
                value: form.answer.clone(),
            });
        } else if form.is_priority() {
            analysis.empty_priority.push(PendingField {
                id: node.code().to_string(),
                name: node.name.clone(),
                options: form.options.clone(),
            });
        }
    }
    analysis
}

fn field_line(id: &str, name: &str, form: &FieldForm) -> String {
    let mut line = format!("\n- ID: {}, 名前: {}", id, name);
    if !form.options.is_empty() {
        line.push_str(&format!(", 選択肢: {}", form.options));
    }
    if form.is_priority() {
        line.push_str(" [優先]");
    }
    if !form.description.is_empty() {
        line.push_str(&format!("\n  説明: {}", form.description));
    }
    line
}

/// System prompt for the hearing conversation.
pub fn conversation_system(doc: &SheetDocument) -> String {
    let mut prompt = String::from(
        "あなたは「BRIDGE AIアシスタント」です。教員と司書をつなぐ打ち合わせシートの入力を支援します。\n\n\
         【役割】\n\
         - 対話を通じて授業や資料提供に関する情報を収集する\n\
         - 収集した情報を適切なフィールドに自動入力する\n\
         - prior: 1 の項目を優先的に質問する\n\
         - 自然で親しみやすい対話を心がける\n\n\
         【シート構造】\n\
         以下のフィールドがあります:\n\n",
    );

    for handle in doc.terminal_fields() {
        if let Some(node) = doc.node(handle) {
            if let Some(form) = node.kind.form() {
                prompt.push_str(&field_line(node.code(), &node.name, form));
            }
        }
    }

    prompt.push_str(
        "\n\n【対話の進め方】\n\
         1. **一度に1つか2つの質問のみ**を行う（決して3つ以上質問しない）\n\
         2. まだ入力されていない優先項目から順に質問する\n\
         3. 選択肢がある項目は選択肢を提示する\n\
         4. ユーザーの回答から関連する情報を抽出し、適切なフィールドに入力する\n\
         5. 一度に複数の項目を埋められる場合は積極的に埋める\n\
         6. すべての重要な情報が収集できたら、ユーザーに確認する\n\n\
         【重要な制約】\n\
         - 1回のメッセージで質問するのは最大2つまで\n\
         - 簡潔で分かりやすい質問を心がける\n\
         - ユーザーが答えやすいように質問を工夫する\n\n\
         【フィールドタイプ別の入力ルール】\n\
         - **選択肢がある項目（checkbox, radio）**: ユーザーの回答内容に該当する選択肢がある場合、必ず選択肢の値をそのまま使用する\n\
         - 選択肢に該当しない場合のみ、詳細欄（form-sub）にテキストで入力する\n\
         - **テキスト入力項目**: ユーザーの回答をそのまま入力\n\n\
         【出力形式】\n\
         必ずJSON形式で、ユーザーへのメッセージ（message）と入力内容（updates）を返してください。\n\
         updatesが空の配列の場合でも必ず含めてください。",
    );
    prompt
}

/// System prompt for generating the opening question of a hearing.
pub fn initial_question_system(analysis: &SheetAnalysis) -> String {
    let mut context = String::from("【現在のシート状態】\n");
    context.push_str(&format!("- 総フィールド数: {}\n", analysis.total_fields));
    context.push_str(&format!("- 入力済み: {}\n", analysis.filled_count()));

    if !analysis.filled.is_empty() {
        context.push_str("- 入力済みフィールド:\n");
        for field in &analysis.filled {
            context.push_str(&format!("  - {}: {}\n", field.name, field.value));
        }
    }

    if !analysis.empty_priority.is_empty() {
        context.push_str("- 未入力の優先フィールド:\n");
        for field in &analysis.empty_priority {
            context.push_str(&format!("  - {}", field.name));
            if !field.options.is_empty() {
                context.push_str(&format!(" (選択肢: {})", field.options));
            }
            context.push('\n');
        }
    }

    format!(
        "あなたはBRIDGE AIアシスタントです。教員との対話を通じて授業の打ち合わせシートを埋めていきます。\n\n\
         {}\n\
         【あなたの役割】\n\
         シートの現在の状態を分析し、次に何を質問すべきか判断してください。\n\n\
         【質問作成のガイドライン】\n\
         1. すでに入力されている情報は簡潔に確認する（任意）\n\
         2. 未入力の優先項目から最も重要なものを1つ選ぶ\n\
         3. 自然で親しみやすい質問にする\n\
         4. 選択肢がある場合は提示する\n\
         5. 一度に1つか2つの質問のみ\n\
         6. 簡潔に（2-3文程度）\n\n\
         【出力形式】\n\
         必ずJSON形式で質問内容（message）を返してください。",
        context
    )
}

/// Deterministic question used when the model cannot be reached: the first
/// unfilled priority field, or a wrap-up prompt when none remain.
pub fn fallback_question(analysis: &SheetAnalysis) -> String {
    match analysis.empty_priority.first() {
        Some(field) => {
            let mut question = format!("{}について教えてください。", field.name);
            if !field.options.is_empty() {
                question.push_str(&format!("\n選択肢: {}", field.options));
            }
            question
        }
        None => FALLBACK_DONE.to_string(),
    }
}

/// Source material handed to the bulk importer.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone)]
pub enum AttachmentKind {
    Text(String),
    /// Image content is not inlined; the prompt only flags its presence.
    Image,
}

impl Attachment {
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self { name: name.into(), kind: AttachmentKind::Text(content.into()) }
    }

    pub fn image(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: AttachmentKind::Image }
    }
}

/// Prompt for the bulk importer: sheet structure with current values, then
/// the provided material verbatim.
pub fn bulk_input(
    doc: &SheetDocument,
    attachments: &[Attachment],
    text_input: &str,
    instructions: &str,
) -> String {
    let mut prompt = String::from("あなたは教育用の打ち合わせシート入力アシスタントです。\n\n");

    prompt.push_str("【シート構造】\nシートには以下のフィールドがあります：\n");
    for handle in doc.terminal_fields() {
        if let Some(node) = doc.node(handle) {
            if let Some(form) = node.kind.form() {
                prompt.push_str(&format!(
                    "- {} ({}): {} [現在値: {}]\n",
                    node.code(),
                    node.name,
                    form.description,
                    form.answer
                ));
            }
        }
    }

    prompt.push_str("\n【提供された情報】\n");

    if !attachments.is_empty() {
        prompt.push_str("ファイル内容:\n");
        for attachment in attachments {
            prompt.push_str(&format!("\n--- {} ---\n", attachment.name));
            match &attachment.kind {
                AttachmentKind::Text(content) => {
                    prompt.push_str(content);
                    prompt.push('\n');
                }
                AttachmentKind::Image => prompt.push_str("[画像ファイル]\n"),
            }
        }
    }

    if !text_input.is_empty() {
        prompt.push_str(&format!("\nテキスト入力:\n{}\n", text_input));
    }

    if !instructions.is_empty() {
        prompt.push_str(&format!("\n【追加指示】\n{}\n", instructions));
    }

    prompt.push_str(
        "\n上記の情報を基に、シートの各フィールドに適切な内容を入力してください。\n\
         フィールドIDをキーとし、入力内容を値とするJSONオブジェクトで返してください。\n",
    );
    prompt
}
