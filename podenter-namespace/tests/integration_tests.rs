use podenter_core::ProcessId;
use podenter_namespace::*;

const SUBSETS: [NamespaceFlags; 7] = [
    NamespaceFlags::MNT,
    NamespaceFlags::UTS,
    NamespaceFlags::IPC,
    NamespaceFlags::NET,
    NamespaceFlags::PID,
    NamespaceFlags::CGROUP,
    NamespaceFlags::USER,
];

const TOKENS: [&str; 7] = [
    "--mount", "--uts", "--ipc", "--net", "--pid", "--cgroup", "--user",
];

#[test]
fn test_every_subset_renders_canonically() {
    let program = vec!["cat".to_string(), "/etc/hostname".to_string()];

    for mask in 0u32..(1 << SUBSETS.len()) {
        let chosen: Vec<usize> = (0..SUBSETS.len()).filter(|i| mask & (1 << i) != 0).collect();

        // enable in reverse order, each twice
        let mut request = JoinRequest::new().with_target(ProcessId::from_raw(31337));
        for &i in chosen.iter().rev() {
            request = request
                .with_namespace(SUBSETS[i])
                .with_namespace(SUBSETS[i]);
        }
        let rendered = request.with_program(program.clone()).render().unwrap();

        let mut expected = vec!["--target=31337".to_string()];
        expected.extend(chosen.iter().map(|&i| TOKENS[i].to_string()));
        expected.push("--".to_string());
        expected.extend(program.iter().cloned());

        assert_eq!(rendered.args, expected, "mask {mask:#09b}");
        assert_eq!(
            rendered.args.iter().filter(|a| a.starts_with("--target")).count(),
            1
        );
    }
}

#[test]
fn test_program_arguments_are_verbatim() {
    let program = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo --pid -- $HOME".to_string(),
    ];
    let rendered = JoinRequest::new()
        .with_namespace(NamespaceFlags::PID)
        .with_target(ProcessId::from_raw(5))
        .with_program(program.clone())
        .render()
        .unwrap();

    let separator = rendered.args.iter().position(|a| a == "--").unwrap();
    assert_eq!(&rendered.args[separator + 1..], program.as_slice());
}

#[test]
fn test_tools_mode_request() {
    let rendered = JoinRequest::new()
        .with_namespaces(
            NamespaceFlags::PID | NamespaceFlags::NET | NamespaceFlags::IPC | NamespaceFlags::UTS,
        )
        .with_target(ProcessId::from_raw(812))
        .with_env(["PATH=/usr/local/bin:/usr/bin"])
        .with_env_override("TERM=xterm")
        .with_working_dir(WorkingDir::Based {
            base: "/croot".to_string(),
            recorded: "/srv/www".to_string(),
        })
        .with_program(vec!["remount-proc-exec".to_string(), "bash".to_string()])
        .render()
        .unwrap();

    assert_eq!(
        rendered.args,
        vec![
            "--target=812",
            "--uts",
            "--ipc",
            "--net",
            "--pid",
            "--wd=/croot/srv/www",
            "--",
            "remount-proc-exec",
            "bash"
        ]
    );
    assert_eq!(rendered.env.last().map(String::as_str), Some("PWD=/croot/srv/www"));
}

#[test]
fn test_namespace_info_for_self() {
    let pid = ProcessId::from_raw(std::process::id());
    let info = NamespaceInfo::for_pid(pid, NamespaceFlags::UTS).unwrap();

    assert_eq!(info.len(), 1);
    assert!(info.to_string().contains("uts="));
}
