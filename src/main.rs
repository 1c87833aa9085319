use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use colored::*;
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use timon_buz::clients::{DataGateway, InMemoryGateway};
use timon_buz::config::environment::EnvironmentConfig;
use timon_buz::models::auth::{CompanySignUpData, LoginRequest, PassengerSignUpData};
use timon_buz::models::horario::HorarioParaSalvar;
use timon_buz::models::linha::{Linha, UpdateLinhaData};
use timon_buz::models::viagem::{DiaSemana, NovaViagem, Viagem};
use timon_buz::services::{AuthStatus, Notifier};
use timon_buz::views::{self, theme, FormatoDias, MenuOption, NovaLinhaEditor, RouteTree, SearchState};
use timon_buz::{AppError, AppState};

/// Alertas impressos no terminal
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, title: &str, message: &str) {
        println!("{} {}", format!("⚠️ {}:", title).bright_red().bold(), message.bright_red());
    }
}

fn accent(text: &str) -> ColoredString {
    let (r, g, b) = theme::rgb(theme::BUTTON_BACKGROUND).unwrap_or((249, 168, 38));
    text.truecolor(r, g, b).bold()
}

fn muted(text: &str) -> ColoredString {
    let (r, g, b) = theme::rgb(theme::TEXT_SECONDARY).unwrap_or((204, 204, 204));
    text.truecolor(r, g, b)
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", format!("{}: ", label).bright_yellow());
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(title: &str, message: &str, confirm_label: &str) -> io::Result<bool> {
    println!("{}", title.bright_white().bold());
    println!("{}", muted(message));
    let answer = prompt(&format!("{} (s/N)", confirm_label))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "s" | "sim"))
}

/// Lista numerada; devolve o índice escolhido (Enter volta)
fn choose<T>(items: &[T], label: impl Fn(&T) -> String) -> io::Result<Option<usize>> {
    if items.is_empty() {
        println!("{}", muted("(nenhum item)"));
        return Ok(None);
    }
    for (index, item) in items.iter().enumerate() {
        println!("{} {}", accent(&format!("{:>2}.", index + 1)), label(item));
    }
    let answer = prompt("Escolha (Enter para voltar)")?;
    Ok(answer.trim().parse::<usize>().ok().filter(|n| (1..=items.len()).contains(n)).map(|n| n - 1))
}

fn show_error(error: &AppError) {
    match error {
        AppError::Validation(errors) => {
            for (field, message) in views::field_errors(errors) {
                println!("{} {}", format!("✗ {}:", field).bright_red(), message);
            }
        }
        other => println!("{}", format!("❌ {}", other.user_message()).bright_red()),
    }
}

fn linha_label(linha: &Linha) -> String {
    let estrela = if linha.is_favorito { "★ " } else { "" };
    format!("{}{} - Número: {}", estrela, linha.nome, linha.numero)
}

fn viagem_label(viagem: &Viagem) -> String {
    format!(
        "{} ({})",
        viagem.descricao,
        views::formatar_dias_semana(viagem.dias_semana.as_deref(), FormatoDias::Curto)
    )
}

fn parse_dias(input: &str) -> Vec<DiaSemana> {
    match input.trim().to_lowercase().as_str() {
        "" | "todos" => DiaSemana::TODOS.to_vec(),
        "uteis" | "úteis" => DiaSemana::UTEIS.to_vec(),
        "fds" => vec![DiaSemana::Sab, DiaSemana::Dom],
        other => other.split(',').filter_map(DiaSemana::from_codigo).collect(),
    }
}

// ---------------------------------------------------------------------------
// Telas públicas
// ---------------------------------------------------------------------------

async fn public_menu(state: &AppState) -> Result<bool> {
    println!();
    println!("{}", "🚌 TIMON BUZ".bright_green().bold());
    println!("1. 🔐 Entrar");
    println!("2. 🧍 Cadastrar passageiro");
    println!("3. 🏢 Cadastrar empresa");
    println!("4. 📧 Reenviar e-mail de confirmação");
    println!("0. 🚪 Sair");

    match prompt("Opção")?.trim() {
        "1" => {
            let request = LoginRequest {
                email: prompt("E-mail")?.trim().to_string(),
                password: prompt("Senha")?,
            };
            if let Err(message) = views::forms::check_login(&request) {
                println!("{}", message.bright_red());
                return Ok(true);
            }
            match state.auth.login(&request.email, &request.password).await {
                Ok(()) => println!("{}", "✅ Bem-vindo!".bright_green()),
                Err(e) => show_error(&e),
            }
        }
        "2" => {
            let data = PassengerSignUpData {
                name: prompt("Nome")?,
                email: prompt("E-mail")?,
                password: prompt("Senha")?,
            };
            match state.auth.sign_up_as_passenger(&data).await {
                Ok(outcome) if outcome.session.is_none() => verify_email(state, data.email.trim()).await?,
                Ok(_) => println!("{}", "✅ Conta criada!".bright_green()),
                Err(e) => show_error(&e),
            }
        }
        "3" => {
            let data = CompanySignUpData {
                company_name: prompt("Nome da empresa")?,
                cnpj: prompt("CNPJ")?,
                admin_name: prompt("Seu nome")?,
                email: prompt("E-mail")?,
                password: prompt("Senha")?,
            };
            match state.auth.sign_up_as_company_admin(&data).await {
                Ok(outcome) if outcome.session.is_none() => verify_email(state, data.email.trim()).await?,
                Ok(_) => println!("{}", "✅ Empresa cadastrada!".bright_green()),
                Err(e) => show_error(&e),
            }
        }
        "4" => {
            let email = prompt("E-mail")?;
            verify_email(state, email.trim()).await?;
        }
        "0" => return Ok(false),
        _ => println!("{}", "❌ Opção inválida.".bright_red()),
    }
    Ok(true)
}

async fn verify_email(state: &AppState, email: &str) -> Result<()> {
    println!("{}", "📧 Confirme seu Cadastro".bright_cyan().bold());
    println!("Enviamos um link de confirmação para o seu e-mail: {}", accent(email));
    println!("{}", muted("Por favor, clique no link para ativar sua conta e poder fazer login."));
    if prompt("Não recebeu? Reenviar e-mail (s/N)")?.trim().eq_ignore_ascii_case("s") {
        match state.auth.resend_confirmation_email(email).await {
            Ok(()) => println!("{}", "✅ E-mail reenviado.".bright_green()),
            Err(e) => state.notifier.alert("Erro", &e.user_message()),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Passageiro
// ---------------------------------------------------------------------------

async fn passenger_menu(state: &AppState) -> Result<bool> {
    let nome = state.auth.profile().await.map(|p| p.name).unwrap_or_default();
    println!();
    println!("{}", format!("🚌 Olá, {}", nome).bright_green().bold());
    for (index, screen) in RouteTree::Passenger.tabs().iter().enumerate() {
        println!("{}. {}", index + 1, screen.name());
    }
    println!("0. 🚪 Fechar");

    match prompt("Opção")?.trim() {
        "1" => empresas_screen(state).await?,
        "2" => all_linhas_screen(state).await?,
        "3" => favoritos_screen(state).await?,
        "4" => return profile_screen(state).await,
        "0" => return Ok(false),
        _ => println!("{}", "❌ Opção inválida.".bright_red()),
    }
    Ok(true)
}

async fn empresas_screen(state: &AppState) -> Result<()> {
    println!("{}", "🏢 Empresas de Ônibus".bright_cyan().bold());
    let empresas = match state.empresas.get_empresas().await {
        Ok(empresas) => empresas,
        Err(_) => state.empresas.empresas().await,
    };
    if let Some(index) = choose(&empresas, |e| e.nome.clone())? {
        let empresa = &empresas[index];
        if let Ok(linhas) = state.linhas.get_linhas_by_empresa_id(empresa.id).await {
            let _ = state.linhas.get_favorite_linhas().await;
            linhas_list(state, &linhas).await?;
        }
    }
    Ok(())
}

async fn all_linhas_screen(state: &AppState) -> Result<()> {
    println!("{}", "🗺️ Todas as Linhas".bright_cyan().bold());
    let Ok(linhas) = state.linhas.get_all_linhas().await else {
        return Ok(());
    };
    let _ = state.linhas.get_favorite_linhas().await;

    let mut search = SearchState::new();
    search.set_query(prompt("Buscar por nome ou número (Enter para todas)")?);
    search.submit();
    let filtradas = search.apply(&linhas);
    linhas_list(state, &filtradas).await
}

async fn linhas_list(state: &AppState, linhas: &[Linha]) -> Result<()> {
    let linhas = state.linhas.with_favorites(linhas).await;
    if let Some(index) = choose(&linhas, linha_label)? {
        let linha = &linhas[index];
        println!("1. Ver viagens");
        println!(
            "2. {}",
            if linha.is_favorito { "Remover dos favoritos" } else { "Adicionar aos favoritos" }
        );
        match prompt("Opção")?.trim() {
            "1" => viagens_da_linha(state, linha).await?,
            "2" => {
                if state.linhas.toggle_favorito(linha.id, linha.is_favorito).await.is_ok() {
                    println!("{}", "⭐ Favoritos atualizados.".bright_green());
                }
            }
            _ => {}
        }
    }
    Ok(())
}

async fn viagens_da_linha(state: &AppState, linha: &Linha) -> Result<()> {
    println!("{}", format!("🚍 Viagens da linha {}", linha.nome).bright_cyan().bold());
    let Ok(viagens) = state.viagens.get_viagens_da_linha(linha.id).await else {
        return Ok(());
    };
    let mut search = SearchState::new();
    if viagens.len() > 5 {
        search.set_query(prompt("Filtrar viagens (Enter para todas)")?);
        search.submit();
    }
    let viagens = search.apply(&viagens);
    if let Some(index) = choose(&viagens, viagem_label)? {
        detalhe_viagem(state, linha.id, &viagens[index]).await?;
    }
    Ok(())
}

async fn detalhe_viagem(state: &AppState, linha_id: Uuid, viagem: &Viagem) -> Result<()> {
    let pontos = state.linhas.get_pontos_da_linha(linha_id).await.unwrap_or_default();
    let horarios = state.linhas.get_horarios_da_viagem(viagem.id).await.unwrap_or_default();

    println!("{}", viagem.descricao.bright_white().bold());
    println!(
        "{} {}",
        muted("Dias de Funcionamento:"),
        views::formatar_dias_semana(viagem.dias_semana.as_deref(), FormatoDias::Longo)
    );
    for parada in views::rota_completa(&pontos, &horarios) {
        println!("  {} {} {}", accent(&parada.horario), muted(&format!("{:>2}.", parada.ordem)), parada.descricao);
    }
    Ok(())
}

async fn favoritos_screen(state: &AppState) -> Result<()> {
    println!("{}", "❤️ Linhas Favoritas".bright_cyan().bold());
    let Ok(favoritas) = state.linhas.get_favorite_linhas().await else {
        return Ok(());
    };
    if favoritas.is_empty() {
        println!("{}", muted("Você ainda não favoritou nenhuma linha."));
        return Ok(());
    }
    linhas_list(state, &favoritas).await
}

async fn profile_screen(state: &AppState) -> Result<bool> {
    if let Err(e) = state.auth.refresh_profile().await {
        warn!("Perfil não recarregado: {}", e);
    }
    let snapshot = state.auth.snapshot().await;
    if let Some(profile) = &snapshot.profile {
        println!("{}", profile.name.bright_white().bold());
        println!("{}", muted(profile.role.as_str()));
    }
    if let Some(email) = snapshot.user.as_ref().and_then(|u| u.email.clone()) {
        println!("{}", muted(&email));
    }

    let option = match choose(&MenuOption::ALL[..], |o| o.label().to_string())? {
        Some(index) => MenuOption::ALL[index],
        None => return Ok(true),
    };
    if let Some(confirmation) = option.confirmation() {
        if !confirm(confirmation.title, confirmation.message, confirmation.confirm)? {
            return Ok(true);
        }
    }
    match option {
        MenuOption::Sobre => {
            println!("{}", "Timon Buz".bright_white().bold());
            println!("{}", muted("Seu guia de transporte público em Timon"));
            println!("{}", muted(&format!("Versão {}", env!("CARGO_PKG_VERSION"))));
        }
        MenuOption::ExcluirConta => {
            if let Err(e) = state.auth.delete_user_account().await {
                state.notifier.alert("Erro", &e.user_message());
            }
        }
        MenuOption::SairDaConta => {
            if let Err(e) = state.auth.logout().await {
                warn!("Logout remoto falhou: {}", e);
            }
        }
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Empresa
// ---------------------------------------------------------------------------

async fn company_menu(state: &AppState) -> Result<bool> {
    println!();
    println!("{}", "🏢 Painel da Empresa".bright_green().bold());
    println!("{}", muted("Gerencie suas linhas e viagens"));
    println!("1. 📋 Minhas linhas");
    println!("2. ➕ Nova linha");
    println!("3. 👤 Perfil");
    println!("0. 🚪 Fechar");

    match prompt("Opção")?.trim() {
        "1" => minhas_linhas(state).await?,
        "2" => nova_linha(state).await?,
        "3" => return profile_screen(state).await,
        "0" => return Ok(false),
        _ => println!("{}", "❌ Opção inválida.".bright_red()),
    }
    Ok(true)
}

async fn minhas_linhas(state: &AppState) -> Result<()> {
    let Ok(linhas) = state.linhas.get_linhas_da_empresa().await else {
        return Ok(());
    };
    if linhas.is_empty() {
        println!("{}", muted("Nenhuma linha cadastrada ainda. Adicione sua primeira linha."));
        return Ok(());
    }
    if let Some(index) = choose(&linhas, linha_label)? {
        linha_detail(state, &linhas[index]).await?;
    }
    Ok(())
}

async fn nova_linha(state: &AppState) -> Result<()> {
    let mut editor = NovaLinhaEditor::new();
    editor.nome = prompt("Nome da linha")?;
    editor.numero = prompt("Número")?;
    println!("{}", muted("Informe os pontos na ordem do itinerário (Enter vazio termina)."));
    loop {
        let descricao = prompt(&format!("Ponto {}", editor.pontos().len() + 1))?;
        if descricao.trim().is_empty() {
            break;
        }
        if let Err(message) = editor.add_ponto(&descricao) {
            println!("{}", message.bright_red());
        }
    }

    let data = match editor.into_create_data() {
        Ok(data) => data,
        Err(message) => {
            println!("{}", format!("Atenção: {}", message).bright_yellow());
            return Ok(());
        }
    };
    match state.linhas.add_linha(&data).await {
        Ok(linha) => println!("{}", format!("✅ Linha {} criada.", linha.nome).bright_green()),
        Err(e @ AppError::Validation(_)) => show_error(&e),
        Err(_) => {}
    }
    Ok(())
}

async fn linha_detail(state: &AppState, linha: &Linha) -> Result<()> {
    loop {
        println!();
        println!("{}", format!("🚌 {} - Número: {}", linha.nome, linha.numero).bright_cyan().bold());
        println!("1. ✏️ Editar linha");
        println!("2. 📍 Pontos do itinerário");
        println!("3. 🚍 Viagens");
        println!("4. 🗑️ Excluir linha");
        println!("0. ↩️ Voltar");

        match prompt("Opção")?.trim() {
            "1" => {
                let data = UpdateLinhaData {
                    nome: prompt(&format!("Nome [{}]", linha.nome))?,
                    numero: prompt(&format!("Número [{}]", linha.numero))?,
                };
                if let Err(e @ AppError::Validation(_)) = state.linhas.update_linha(linha.id, &data).await {
                    show_error(&e);
                }
            }
            "2" => manage_pontos(state, linha.id).await?,
            "3" => manage_viagens(state, linha).await?,
            "4" => {
                let pergunta = format!("Excluir a linha \"{}\" com todos os pontos, viagens e horários?", linha.nome);
                if confirm("Confirmar Exclusão", &pergunta, "Excluir")?
                    && state.linhas.delete_linha(linha.id).await.is_ok()
                {
                    println!("{}", "🗑️ Linha excluída.".bright_green());
                    return Ok(());
                }
            }
            _ => return Ok(()),
        }
    }
}

async fn manage_pontos(state: &AppState, linha_id: Uuid) -> Result<()> {
    loop {
        let pontos = state.linhas.get_pontos_da_linha(linha_id).await.unwrap_or_default();
        for ponto in &pontos {
            println!("  {} {}", accent(&format!("{:>2}.", ponto.ordem)), ponto.descricao);
        }
        println!("a. ➕ Adicionar ponto   r. ➖ Remover ponto   Enter. ↩️ Voltar");
        match prompt("Opção")?.trim() {
            "a" => {
                let descricao = prompt("Descrição do ponto")?;
                match views::forms::check_ponto_descricao(&descricao) {
                    Ok(descricao) => {
                        let ordem = state.linhas.proxima_ordem().await;
                        let _ = state.linhas.add_ponto(linha_id, &descricao, ordem).await;
                    }
                    Err(message) => println!("{}", message.bright_red()),
                }
            }
            "r" => {
                if let Some(index) = choose(&pontos, |p| p.descricao.clone())? {
                    let _ = state.linhas.delete_ponto(pontos[index].id).await;
                }
            }
            _ => return Ok(()),
        }
    }
}

async fn manage_viagens(state: &AppState, linha: &Linha) -> Result<()> {
    loop {
        let viagens = state.viagens.get_viagens_da_linha(linha.id).await.unwrap_or_default();
        for viagem in &viagens {
            println!("  • {}", viagem_label(viagem));
        }
        println!("n. ➕ Nova viagem   e. ✏️ Editar   h. 🕒 Horários   x. 🗑️ Excluir   Enter. ↩️ Voltar");
        match prompt("Opção")?.trim() {
            "n" => nova_viagem(state, linha.id).await?,
            "e" => {
                if let Some(index) = choose(&viagens, viagem_label)? {
                    let viagem = &viagens[index];
                    let descricao = prompt(&format!("Descrição [{}]", viagem.descricao))?;
                    let descricao = match views::forms::check_viagem_descricao(&descricao) {
                        Ok(descricao) => descricao,
                        Err(message) => {
                            println!("{}", message.bright_red());
                            continue;
                        }
                    };
                    let dias = parse_dias(&prompt("Dias (todos, uteis, fds ou seg,ter,...)")?);
                    let _ = state.viagens.update_viagem(viagem.id, &descricao, &dias).await;
                }
            }
            "h" => {
                if let Some(index) = choose(&viagens, viagem_label)? {
                    manage_horarios(state, linha.id, &viagens[index]).await?;
                }
            }
            "x" => {
                if let Some(index) = choose(&viagens, viagem_label)? {
                    let viagem = &viagens[index];
                    let (title, message) = views::menu::confirmar_exclusao_viagem(&viagem.descricao);
                    if confirm(&title, &message, "Excluir")? {
                        let _ = state.viagens.delete_viagem(viagem.id).await;
                    }
                }
            }
            _ => return Ok(()),
        }
    }
}

async fn nova_viagem(state: &AppState, linha_id: Uuid) -> Result<()> {
    let pontos = state.linhas.get_pontos_da_linha(linha_id).await.unwrap_or_default();
    if let Err(message) = views::ensure_viagem_possivel(&pontos) {
        println!("{}", format!("Atenção: {}", message).bright_yellow());
        return Ok(());
    }

    let descricao = prompt("Descrição (ex: Dias Úteis - Manhã)")?;
    let dias_semana = parse_dias(&prompt("Dias (todos, uteis, fds ou seg,ter,...)")?);
    let mut horarios = Vec::new();
    for ponto in &pontos {
        loop {
            let input = prompt(&format!("Horário em '{}' (HH:mm, Enter pula)", ponto.descricao))?;
            if input.trim().is_empty() {
                break;
            }
            match views::forms::parse_horario(&input) {
                Ok(horario_previsto) => {
                    horarios.push(HorarioParaSalvar {
                        ponto_itinerario_id: ponto.id,
                        horario_previsto,
                    });
                    break;
                }
                Err(message) => println!("{}", message.bright_red()),
            }
        }
    }

    let nova = NovaViagem {
        descricao,
        dias_semana,
        horarios,
    };
    match state.viagens.add_viagem_with_horarios(linha_id, &nova).await {
        Ok(viagem) => println!("{}", format!("✅ Viagem '{}' criada.", viagem.descricao).bright_green()),
        Err(e @ AppError::Validation(_)) => show_error(&e),
        Err(_) => {}
    }
    Ok(())
}

async fn manage_horarios(state: &AppState, linha_id: Uuid, viagem: &Viagem) -> Result<()> {
    let pontos = state.linhas.get_pontos_da_linha(linha_id).await.unwrap_or_default();
    let horarios = state.linhas.get_horarios_da_viagem(viagem.id).await.unwrap_or_default();
    let mut form = views::HorariosForm::from_horarios(&horarios);

    for ponto in &pontos {
        let atual = form.input(ponto.id).to_string();
        let input = prompt(&format!("{} [{}]", ponto.descricao, if atual.is_empty() { "--:--" } else { atual.as_str() }))?;
        if input.trim().is_empty() {
            continue;
        }
        form.set_input(ponto.id, input.trim());
        match form.to_upsert(viagem.id, ponto.id) {
            Ok(upsert) => {
                let _ = state.linhas.upsert_horario(upsert).await;
            }
            Err(message) => state.notifier.alert("Erro", message),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Carregar variáveis de ambiente
    dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let offline = std::env::args().any(|arg| arg == "--offline");
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    let state = if offline {
        info!("🧪 Modo offline: dados em memória");
        let gateway: Arc<dyn DataGateway> = Arc::new(InMemoryGateway::new());
        AppState::new(gateway, notifier)
    } else {
        let config = EnvironmentConfig::from_env()?;
        info!("🌐 Backend: {} ({})", config.supabase_url, config.environment);
        AppState::connect(config, notifier)?
    };

    println!("{}", "🚌 Timon Buz".bright_blue().bold());
    println!("{}", "=====================================".bright_blue());
    state.initialize().await?;

    loop {
        let tree = RouteTree::for_status(state.auth.status().await);
        let keep_going = match tree {
            RouteTree::Loading => {
                tokio::task::yield_now().await;
                true
            }
            RouteTree::Public => public_menu(&state).await?,
            RouteTree::Passenger => passenger_menu(&state).await?,
            RouteTree::Company => company_menu(&state).await?,
        };
        if !keep_going {
            break;
        }
    }

    if matches!(state.auth.status().await, AuthStatus::Authenticated(_)) {
        info!("💾 Sessão mantida para a próxima execução");
    }
    println!("{}", "👋 Até logo!".bright_green());
    Ok(())
}
